use std::sync::Arc;

use capquote_core::config::{AppConfig, TableSourceKind};
use capquote_core::cpq::defaults::default_tables;
use capquote_core::cpq::repository::{
    FilePriceTableSource, InMemoryPriceTableSource, PriceTableSource,
};
use capquote_core::errors::PricingError;
use thiserror::Error;
use tracing::info;

use crate::repositories::{RepositoryError, SqlPriceTableSource};
use crate::{connect_with_config, migrations, seed_default_tables, DbPool};

/// The configured table source, plus the pool when the source is the database.
pub struct OpenedSource {
    pub kind: TableSourceKind,
    pub source: Arc<dyn PriceTableSource>,
    pub pool: Option<DbPool>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("pricing.tables_path is required for the file table source")]
    MissingTablesPath,
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("seeding default price tables failed: {0}")]
    Seed(#[source] RepositoryError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Opens the table source named by `pricing.source`.
///
/// The database source runs pending migrations and seeds the built-in tables into an empty
/// schema so a fresh install can quote immediately.
pub async fn open_table_source(config: &AppConfig) -> Result<OpenedSource, SourceError> {
    let kind = config.pricing.source;
    let opened = match kind {
        TableSourceKind::Builtin => OpenedSource {
            kind,
            source: Arc::new(InMemoryPriceTableSource::new(default_tables()?)),
            pool: None,
        },
        TableSourceKind::File => {
            let path = config.pricing.tables_path.clone().ok_or(SourceError::MissingTablesPath)?;
            OpenedSource { kind, source: Arc::new(FilePriceTableSource::new(path)), pool: None }
        }
        TableSourceKind::Database => {
            let pool = connect_with_config(&config.database)
                .await
                .map_err(SourceError::DatabaseConnect)?;
            migrations::run_pending(&pool).await.map_err(SourceError::Migration)?;

            let source = SqlPriceTableSource::new(pool.clone());
            if source.count().await.map_err(SourceError::Seed)? == 0 {
                let report = seed_default_tables(&pool).await.map_err(SourceError::Seed)?;
                info!(
                    event_name = "pricing.table_source.seeded_defaults",
                    tables_written = report.tables_written,
                    "empty price table schema seeded with built-in tables"
                );
            }
            OpenedSource { kind, source: Arc::new(source), pool: Some(pool) }
        }
    };

    info!(
        event_name = "pricing.table_source.opened",
        source = %opened.source.describe(),
        "price table source opened"
    );
    Ok(opened)
}

#[cfg(test)]
mod tests {
    use capquote_core::config::{AppConfig, TableSourceKind};

    use super::{open_table_source, SourceError};

    #[tokio::test]
    async fn builtin_source_loads_without_a_database() {
        let opened = open_table_source(&AppConfig::default()).await.expect("open");
        assert!(opened.pool.is_none());
        assert!(!opened.source.load_all().await.expect("tables").is_empty());
    }

    #[tokio::test]
    async fn file_source_needs_a_path() {
        let mut config = AppConfig::default();
        config.pricing.source = TableSourceKind::File;
        assert!(matches!(
            open_table_source(&config).await,
            Err(SourceError::MissingTablesPath)
        ));
    }

    #[tokio::test]
    async fn database_source_seeds_an_empty_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.pricing.source = TableSourceKind::Database;
        config.database.url = format!("sqlite://{}", dir.path().join("tables.db").display());

        let opened = open_table_source(&config).await.expect("open");
        assert!(opened.pool.is_some());
        assert_eq!(opened.source.describe(), "sqlite");
        assert!(opened.source.load_all().await.expect("tables").len() > 100);
    }
}
