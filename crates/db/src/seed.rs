use capquote_core::cpq::defaults::default_tables;
use capquote_core::domain::price_table::PriceTable;
use tracing::info;

use crate::repositories::{RepositoryError, SqlPriceTableSource};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub tables_written: usize,
    pub tables_total: i64,
}

/// Writes the built-in price tables. Re-running replaces them in place.
pub async fn seed_default_tables(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
    seed_tables(pool, &default_tables()?).await
}

pub async fn seed_tables(
    pool: &DbPool,
    tables: &[PriceTable],
) -> Result<SeedReport, RepositoryError> {
    let source = SqlPriceTableSource::new(pool.clone());
    let tables_written = source.save_all(tables).await?;
    let tables_total = source.count().await?;

    info!(event_name = "db.seed.completed", tables_written, tables_total, "price tables seeded");
    Ok(SeedReport { tables_written, tables_total })
}
