use capquote_core::errors::PricingError;
use thiserror::Error;

pub mod price_table;

pub use price_table::SqlPriceTableSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}
