use std::fs;
use std::path::PathBuf;

use capquote_core::cpq::repository::FilePriceTableSource;
use capquote_core::domain::price_table::ItemType;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{execute, open_engine, CommandResult, Failure};

#[derive(Debug, Serialize)]
struct TableSummary {
    item_type: &'static str,
    name: String,
    breakpoints: usize,
    lowest_min_qty: u32,
    starting_unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct TableListing {
    source: String,
    version: u64,
    table_count: usize,
    tables: Vec<TableSummary>,
}

/// Lists every table of the configured source, optionally narrowed to one item type.
pub fn list(item_type: Option<ItemType>) -> CommandResult {
    execute("tables.list", |config| async move {
        let (engine, pool) = open_engine(&config).await?;
        let catalog = engine.catalog().await.map_err(|error| {
            (error.error_class(), error.to_string(), 4u8)
        })?;
        if let Some(pool) = pool {
            pool.close().await;
        }

        let tables = catalog
            .tables()
            .filter(|table| item_type.map_or(true, |wanted| table.item_type() == wanted))
            .filter_map(|table| {
                let first = table.breakpoints().first()?;
                Some(TableSummary {
                    item_type: table.item_type().as_str(),
                    name: table.name().to_string(),
                    breakpoints: table.breakpoints().len(),
                    lowest_min_qty: first.min_qty,
                    starting_unit_price: first.unit_price,
                })
            })
            .collect::<Vec<_>>();

        let listing = TableListing {
            source: catalog.source().to_string(),
            version: catalog.version(),
            table_count: tables.len(),
            tables,
        };
        Ok::<_, Failure>(CommandResult::document("tables.list", &listing))
    })
}

/// Renders the loaded tables as a TOML table document, to `output` or to stdout.
pub fn export(output: Option<PathBuf>) -> CommandResult {
    execute("tables.export", |config| async move {
        let (engine, pool) = open_engine(&config).await?;
        let catalog = engine.catalog().await.map_err(|error| {
            (error.error_class(), error.to_string(), 4u8)
        })?;
        if let Some(pool) = pool {
            pool.close().await;
        }

        let rendered = FilePriceTableSource::render(catalog.tables())
            .map_err(|message| ("serialization", message, 5u8))?;
        let Some(path) = output else {
            return Ok(CommandResult { exit_code: 0, output: rendered });
        };

        fs::write(&path, rendered).map_err(|error| {
            ("export_write", format!("could not write `{}`: {error}", path.display()), 6u8)
        })?;
        Ok::<_, Failure>(CommandResult::success(
            "tables.export",
            format!("wrote {} tables to {}", catalog.len(), path.display()),
        ))
    })
}
