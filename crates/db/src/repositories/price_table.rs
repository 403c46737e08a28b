use std::str::FromStr;

use async_trait::async_trait;
use capquote_core::cpq::repository::PriceTableSource;
use capquote_core::domain::price_table::{
    normalize_name, Breakpoint, ItemType, PriceTable, TableId,
};
use capquote_core::errors::PricingError;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use super::RepositoryError;
use crate::DbPool;

const SELECT_TABLES: &str = "
    SELECT t.item_type, t.name, b.min_qty, b.unit_price
    FROM price_table t
    LEFT JOIN price_breakpoint b ON b.table_id = t.id";

/// Price tables stored in SQLite, one `price_table` row per table and one
/// `price_breakpoint` row per break.
#[derive(Clone)]
pub struct SqlPriceTableSource {
    pool: DbPool,
}

impl SqlPriceTableSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a table and all of its breakpoints.
    pub async fn save(&self, table: &PriceTable) -> Result<(), RepositoryError> {
        self.save_all(std::slice::from_ref(table)).await.map(|_| ())
    }

    /// Writes every table in one transaction.
    pub async fn save_all(&self, tables: &[PriceTable]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let updated_at = Utc::now().to_rfc3339();

        for table in tables {
            let table_id: i64 = sqlx::query_scalar(
                "INSERT INTO price_table (item_type, name, lookup_key, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (item_type, lookup_key)
                 DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at
                 RETURNING id",
            )
            .bind(table.item_type().as_str())
            .bind(table.name())
            .bind(normalize_name(table.name()))
            .bind(&updated_at)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM price_breakpoint WHERE table_id = ?")
                .bind(table_id)
                .execute(&mut *tx)
                .await?;

            for breakpoint in table.breakpoints() {
                sqlx::query(
                    "INSERT INTO price_breakpoint (table_id, min_qty, unit_price) VALUES (?, ?, ?)",
                )
                .bind(table_id)
                .bind(i64::from(breakpoint.min_qty))
                .bind(breakpoint.unit_price.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(tables.len())
    }

    pub async fn delete(&self, id: &TableId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM price_table WHERE item_type = ? AND lookup_key = ?")
            .bind(id.item_type.as_str())
            .bind(&id.name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM price_table").fetch_one(&self.pool).await?)
    }

    pub async fn find(&self, id: &TableId) -> Result<Option<PriceTable>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_TABLES} WHERE t.item_type = ? AND t.lookup_key = ? ORDER BY b.min_qty"
        ))
        .bind(id.item_type.as_str())
        .bind(&id.name)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables_from_rows(&rows)?.into_iter().next())
    }

    pub async fn list(&self) -> Result<Vec<PriceTable>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_TABLES} ORDER BY t.item_type, t.lookup_key, b.min_qty"
        ))
        .fetch_all(&self.pool)
        .await?;

        let tables = tables_from_rows(&rows)?;
        debug!(event_name = "db.price_tables.loaded", table_count = tables.len());
        Ok(tables)
    }

    fn unavailable(&self, error: RepositoryError) -> PricingError {
        match error {
            RepositoryError::Pricing(error) => error,
            other => PricingError::DataUnavailable {
                source_name: self.describe(),
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl PriceTableSource for SqlPriceTableSource {
    fn describe(&self) -> String {
        "sqlite".to_string()
    }

    async fn load_all(&self) -> Result<Vec<PriceTable>, PricingError> {
        self.list().await.map_err(|error| self.unavailable(error))
    }

    async fn load(&self, id: &TableId) -> Result<PriceTable, PricingError> {
        self.find(id).await.map_err(|error| self.unavailable(error))?.ok_or_else(|| {
            PricingError::NotFound { item_type: id.item_type, name: id.name.clone() }
        })
    }
}

/// Groups rows ordered by table into validated tables.
fn tables_from_rows(rows: &[SqliteRow]) -> Result<Vec<PriceTable>, RepositoryError> {
    let mut tables = Vec::new();
    let mut current: Option<(ItemType, String, Vec<Breakpoint>)> = None;

    for row in rows {
        let item_type = ItemType::from_str(&row.try_get::<String, _>("item_type")?)?;
        let name: String = row.try_get("name")?;
        let breakpoint = breakpoint_from_row(row, &name)?;

        let same_table = matches!(
            &current,
            Some((current_type, current_name, _))
                if *current_type == item_type && *current_name == name
        );
        if same_table {
            if let Some((_, _, breakpoints)) = current.as_mut() {
                breakpoints.extend(breakpoint);
            }
            continue;
        }

        if let Some((item_type, name, breakpoints)) = current.take() {
            tables.push(PriceTable::new(name, item_type, breakpoints)?);
        }
        current = Some((item_type, name, breakpoint.into_iter().collect()));
    }

    if let Some((item_type, name, breakpoints)) = current {
        tables.push(PriceTable::new(name, item_type, breakpoints)?);
    }
    Ok(tables)
}

fn breakpoint_from_row(
    row: &SqliteRow,
    table: &str,
) -> Result<Option<Breakpoint>, RepositoryError> {
    let Some(min_qty) = row.try_get::<Option<i64>, _>("min_qty")? else {
        return Ok(None);
    };
    let unit_price: String = row.try_get("unit_price")?;

    let min_qty = u32::try_from(min_qty).map_err(|_| {
        RepositoryError::Decode(format!("table `{table}` has out-of-range min_qty {min_qty}"))
    })?;
    let unit_price = Decimal::from_str(&unit_price).map_err(|error| {
        RepositoryError::Decode(format!(
            "table `{table}` has unreadable price `{unit_price}`: {error}"
        ))
    })?;
    Ok(Some(Breakpoint::new(min_qty, unit_price)))
}
