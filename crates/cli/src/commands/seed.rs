use std::fs;
use std::path::PathBuf;

use capquote_core::cpq::defaults::default_tables;
use capquote_core::cpq::repository::FilePriceTableSource;
use capquote_db::{connect_with_config, migrations, seed_tables};
use tracing::info;

use crate::commands::{execute, CommandResult, Failure};

/// Writes price tables into the configured database: the built-in set, or the tables of a
/// TOML document when `from` is given. Existing tables with the same identity are replaced.
pub fn run(from: Option<PathBuf>) -> CommandResult {
    execute("seed", |config| async move {
        let (origin, tables) = match &from {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|error| {
                    ("seed_input", format!("could not read `{}`: {error}", path.display()), 2u8)
                })?;
                let origin = path.display().to_string();
                let tables = FilePriceTableSource::parse(&raw, &origin)
                    .map_err(|error| ("seed_input", error.to_string(), 2u8))?;
                (origin, tables)
            }
            None => (
                "builtin".to_string(),
                default_tables().map_err(|error| ("seed_input", error.to_string(), 2u8))?,
            ),
        };

        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let report = seed_tables(&pool, &tables)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        pool.close().await;

        info!(
            event_name = "cli.seed.completed",
            origin = %origin,
            tables_written = report.tables_written,
            "price tables seeded"
        );
        Ok::<_, Failure>(CommandResult::success(
            "seed",
            format!(
                "wrote {} tables from {origin}; database now holds {} tables",
                report.tables_written, report.tables_total
            ),
        ))
    })
}
