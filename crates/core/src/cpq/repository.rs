//! Price table loading with retry, per-attempt timeouts and last-known-good fallback.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PricingConfig;
use crate::cpq::catalog::PriceCatalog;
use crate::domain::price_table::{Breakpoint, ItemType, PriceTable, TableId};
use crate::errors::PricingError;

#[async_trait]
pub trait PriceTableSource: Send + Sync {
    /// Short human-readable name used in logs and error messages.
    fn describe(&self) -> String;

    async fn load_all(&self) -> Result<Vec<PriceTable>, PricingError>;

    async fn load(&self, id: &TableId) -> Result<PriceTable, PricingError> {
        self.load_all()
            .await?
            .into_iter()
            .find(|table| &table.id() == id)
            .ok_or_else(|| PricingError::NotFound {
                item_type: id.item_type,
                name: id.name.clone(),
            })
    }
}

#[derive(Default)]
pub struct InMemoryPriceTableSource {
    tables: tokio::sync::RwLock<Vec<PriceTable>>,
}

impl InMemoryPriceTableSource {
    pub fn new(tables: Vec<PriceTable>) -> Self {
        Self { tables: tokio::sync::RwLock::new(tables) }
    }

    pub async fn replace(&self, tables: Vec<PriceTable>) {
        *self.tables.write().await = tables;
    }
}

#[async_trait]
impl PriceTableSource for InMemoryPriceTableSource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn load_all(&self) -> Result<Vec<PriceTable>, PricingError> {
        Ok(self.tables.read().await.clone())
    }
}

/// TOML document of `[[table]]` entries.
#[derive(Clone, Debug)]
pub struct FilePriceTableSource {
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TableDocument {
    #[serde(rename = "table", default)]
    tables: Vec<TableEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TableEntry {
    name: String,
    item_type: ItemType,
    breakpoints: Vec<BreakpointEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct BreakpointEntry {
    min_qty: u32,
    unit_price: Decimal,
}

impl FilePriceTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse(raw: &str, origin: &str) -> Result<Vec<PriceTable>, PricingError> {
        let document: TableDocument =
            toml::from_str(raw).map_err(|error| PricingError::DataUnavailable {
                source_name: origin.to_string(),
                reason: format!("malformed price table document: {error}"),
            })?;

        let mut seen = std::collections::BTreeSet::new();
        let mut tables = Vec::with_capacity(document.tables.len());
        for entry in document.tables {
            let breakpoints = entry
                .breakpoints
                .into_iter()
                .map(|row| Breakpoint::new(row.min_qty, row.unit_price))
                .collect();
            let table = PriceTable::new(entry.name, entry.item_type, breakpoints)?;
            if !seen.insert(table.id()) {
                return Err(PricingError::InvalidTable {
                    table: table.name().to_string(),
                    reason: format!("defined more than once for item type {}", table.item_type()),
                });
            }
            tables.push(table);
        }
        Ok(tables)
    }

    /// Inverse of [`FilePriceTableSource::parse`].
    pub fn render<'a>(tables: impl IntoIterator<Item = &'a PriceTable>) -> Result<String, String> {
        let document = TableDocument {
            tables: tables
                .into_iter()
                .map(|table| TableEntry {
                    name: table.name().to_string(),
                    item_type: table.item_type(),
                    breakpoints: table
                        .breakpoints()
                        .iter()
                        .map(|row| BreakpointEntry {
                            min_qty: row.min_qty,
                            unit_price: row.unit_price,
                        })
                        .collect(),
                })
                .collect(),
        };
        toml::to_string_pretty(&document).map_err(|error| error.to_string())
    }
}

#[async_trait]
impl PriceTableSource for FilePriceTableSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load_all(&self) -> Result<Vec<PriceTable>, PricingError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            PricingError::DataUnavailable {
                source_name: self.describe(),
                reason: error.to_string(),
            }
        })?;
        Self::parse(&raw, &self.describe())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&PricingConfig> for RefreshPolicy {
    fn from(config: &PricingConfig) -> Self {
        Self {
            attempts: config.refresh_retries.max(1),
            backoff: config.retry_backoff(),
            attempt_timeout: config.lookup_timeout(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub version: u64,
    pub table_count: usize,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub stale: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Owns the current [`PriceCatalog`] snapshot and replaces it on explicit refresh.
pub struct PriceTableRepository {
    source: Arc<dyn PriceTableSource>,
    policy: RefreshPolicy,
    snapshot: RwLock<Option<Arc<PriceCatalog>>>,
    next_version: AtomicU64,
    stale: AtomicBool,
}

impl PriceTableRepository {
    pub fn new(source: Arc<dyn PriceTableSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            snapshot: RwLock::new(None),
            next_version: AtomicU64::new(1),
            stale: AtomicBool::new(false),
        }
    }

    pub fn source_name(&self) -> String {
        self.source.describe()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Current snapshot, if any load has ever succeeded.
    pub fn snapshot(&self) -> Option<Arc<PriceCatalog>> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn catalog(&self) -> Result<Arc<PriceCatalog>, PricingError> {
        self.snapshot().ok_or_else(|| PricingError::DataUnavailable {
            source_name: self.source.describe(),
            reason: "price tables have not been loaded".to_string(),
        })
    }

    /// Loads the tables on first use; later calls return the held snapshot.
    pub async fn ensure_loaded(&self) -> Result<Arc<PriceCatalog>, PricingError> {
        if let Some(catalog) = self.snapshot() {
            return Ok(catalog);
        }
        self.refresh().await?;
        self.catalog()
    }

    /// Reloads every table from the source.
    ///
    /// Each attempt is bounded by the policy timeout and attempts back off linearly. When all
    /// attempts fail the previous snapshot keeps serving and the report is marked stale; only a
    /// repository that has never loaded fails with `DataUnavailable`.
    pub async fn refresh(&self) -> Result<RefreshReport, PricingError> {
        let source_name = self.source.describe();
        let mut last_error = None;

        for attempt in 1..=self.policy.attempts {
            match self.load_once(&source_name).await {
                Ok(tables) => {
                    let version = self.next_version.fetch_add(1, Ordering::AcqRel);
                    let catalog = Arc::new(PriceCatalog::new(tables, version, &source_name));
                    let report = RefreshReport {
                        version,
                        table_count: catalog.len(),
                        source: source_name.clone(),
                        loaded_at: catalog.loaded_at(),
                        stale: false,
                        attempts: attempt,
                        error: None,
                    };
                    *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(catalog);
                    self.stale.store(false, Ordering::Release);
                    info!(
                        event_name = "pricing.table_refresh.completed",
                        source = %source_name,
                        version,
                        table_count = report.table_count,
                        attempts = attempt,
                        "price tables loaded"
                    );
                    return Ok(report);
                }
                Err(error) => {
                    warn!(
                        event_name = "pricing.table_refresh.attempt_failed",
                        source = %source_name,
                        attempt,
                        error_class = error.error_class(),
                        error = %error,
                        "price table load attempt failed"
                    );
                    let retryable = !matches!(error, PricingError::InvalidTable { .. });
                    last_error = Some(error);
                    if !retryable {
                        break;
                    }
                    if attempt < self.policy.attempts {
                        tokio::time::sleep(self.policy.backoff * attempt).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| PricingError::DataUnavailable {
            source_name: source_name.clone(),
            reason: "no load attempts were made".to_string(),
        });

        match self.snapshot() {
            Some(catalog) => {
                self.stale.store(true, Ordering::Release);
                warn!(
                    event_name = "pricing.table_refresh.failed",
                    source = %source_name,
                    serving_version = catalog.version(),
                    error = %error,
                    "price table refresh failed; serving last known good tables"
                );
                Ok(RefreshReport {
                    version: catalog.version(),
                    table_count: catalog.len(),
                    source: catalog.source().to_string(),
                    loaded_at: catalog.loaded_at(),
                    stale: true,
                    attempts: self.policy.attempts,
                    error: Some(error.to_string()),
                })
            }
            None => {
                warn!(
                    event_name = "pricing.table_refresh.failed",
                    source = %source_name,
                    error = %error,
                    "price table refresh failed with no cached tables"
                );
                Err(match error {
                    error @ PricingError::InvalidTable { .. } => error,
                    other => PricingError::DataUnavailable {
                        source_name,
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Loads one table straight from the source, falling back to the held snapshot when the
    /// source fails or times out.
    pub async fn load(&self, id: &TableId) -> Result<PriceTable, PricingError> {
        let millis = duration_millis(self.policy.attempt_timeout);
        let outcome = tokio::time::timeout(self.policy.attempt_timeout, self.source.load(id))
            .await
            .unwrap_or_else(|_| {
                Err(PricingError::Timeout { operation: format!("load of {id}"), millis })
            });

        match outcome {
            Ok(table) => Ok(table),
            Err(error @ PricingError::NotFound { .. }) => Err(error),
            Err(error) => {
                let cached = self
                    .snapshot()
                    .and_then(|catalog| catalog.find(id.item_type, &id.name).cloned());
                match cached {
                    Some(table) => {
                        warn!(
                            event_name = "pricing.table_load.stale_fallback",
                            table = %id,
                            error = %error,
                            "serving cached price table after source failure"
                        );
                        Ok(table)
                    }
                    None => Err(PricingError::DataUnavailable {
                        source_name: self.source.describe(),
                        reason: error.to_string(),
                    }),
                }
            }
        }
    }

    async fn load_once(&self, source_name: &str) -> Result<Vec<PriceTable>, PricingError> {
        let millis = duration_millis(self.policy.attempt_timeout);
        let tables = tokio::time::timeout(self.policy.attempt_timeout, self.source.load_all())
            .await
            .map_err(|_| PricingError::Timeout {
                operation: format!("price table load from {source_name}"),
                millis,
            })??;

        if tables.is_empty() {
            return Err(PricingError::DataUnavailable {
                source_name: source_name.to_string(),
                reason: "source returned no price tables".to_string(),
            });
        }
        Ok(tables)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
