//! JSON estimate contract: request parsing, validation, single and batch pricing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{PricingConfig, MAX_BATCH_ITEMS};
use crate::cpq::batch::run_bounded;
use crate::cpq::catalog::PriceCatalog;
use crate::cpq::{EngineCacheStats, QuoteEngine};
use crate::domain::cost::{CostLineItem, QuoteResult};
use crate::domain::logo::{CompositeLogo, LogoDescriptor, LogoHints, LogoSpec};
use crate::domain::price_table::ItemType;
use crate::domain::specification::{
    FabricSelection, QuoteSpecification, DEFAULT_CLOSURE, DEFAULT_DELIVERY_METHOD,
    DEFAULT_PRODUCT_TIER,
};
use crate::errors::PricingError;

/// Reads an order quantity out of free text.
pub trait DescriptionReader: Send + Sync {
    fn quantity(&self, description: &str) -> Option<u32>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateMode {
    #[default]
    Standard,
    Ai,
}

impl EstimateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for EstimateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimateMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "ai" => Ok(Self::Ai),
            other => Err(format!("unknown estimate mode `{other}` (expected standard|ai)")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoRequest {
    pub size: Option<String>,
    pub application: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimateRequest {
    pub quantity: Option<i64>,
    pub tier: Option<String>,
    pub description: Option<String>,
    pub logos: Vec<LogoRequest>,
    pub fabric: Option<String>,
    pub closure: Option<String>,
    pub accessories: Vec<String>,
    pub delivery: Option<String>,
    pub colors: Vec<String>,
}

impl EstimateRequest {
    /// Validates the request and builds the specification it describes.
    ///
    /// `extracted_quantity` is only consulted when the request carries no quantity.
    pub fn to_specification(
        &self,
        catalog: &PriceCatalog,
        extracted_quantity: Option<u32>,
    ) -> Result<QuoteSpecification, PricingError> {
        let quantity = match self.quantity {
            Some(quantity) if quantity <= 0 => {
                return Err(PricingError::validation("quantity", "must be greater than 0"));
            }
            Some(quantity) => u32::try_from(quantity)
                .map_err(|_| PricingError::validation("quantity", "is too large"))?,
            None => extracted_quantity
                .filter(|quantity| *quantity > 0)
                .ok_or_else(|| PricingError::validation("quantity", "is required"))?,
        };

        let product_tier = non_blank(self.tier.as_deref()).unwrap_or(DEFAULT_PRODUCT_TIER);
        if !catalog.contains(ItemType::Product, product_tier) {
            return Err(PricingError::validation(
                "tier",
                format!("unknown product tier `{product_tier}`"),
            ));
        }

        let (fabric, extra) = self
            .fabric
            .as_deref()
            .map_or((None, Vec::new()), FabricSelection::parse_with_extra);
        if !extra.is_empty() {
            return Err(PricingError::validation(
                "fabric",
                format!("at most two fabrics can be combined; remove {}", extra.join(", ")),
            ));
        }

        let logos = self
            .logos
            .iter()
            .enumerate()
            .map(|(index, logo)| logo_spec(index, logo))
            .collect();

        Ok(QuoteSpecification {
            quantity,
            product_tier: product_tier.to_string(),
            colors: clean_list(&self.colors),
            fabric,
            logos,
            closure: non_blank(self.closure.as_deref()).unwrap_or(DEFAULT_CLOSURE).to_string(),
            accessories: clean_list(&self.accessories),
            delivery_method: non_blank(self.delivery.as_deref())
                .unwrap_or(DEFAULT_DELIVERY_METHOD)
                .to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn logo_spec(index: usize, logo: &LogoRequest) -> LogoSpec {
    let position = match non_blank(logo.position.as_deref()) {
        Some(position) => position.to_string(),
        None if index == 0 => "Front".to_string(),
        None => format!("Logo {}", index + 1),
    };
    let raw_tokens = non_blank(logo.kind.as_deref()).map(str::to_string).into_iter().collect();
    let hints = LogoHints {
        decoration_method: None,
        size: logo.size.clone(),
        application_method: logo.application.clone(),
    };
    LogoSpec::new(position, LogoDescriptor::Composite(CompositeLogo { raw_tokens, hints }))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub line_items: Vec<CostLineItem>,
    pub subtotal: Decimal,
    pub per_unit: Decimal,
    pub spec: QuoteSpecification,
}

impl From<QuoteResult> for Estimate {
    fn from(result: QuoteResult) -> Self {
        Self {
            line_items: result.line_items,
            subtotal: result.subtotal,
            per_unit: result.per_unit_cost,
            spec: result.spec,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub response_time_ms: u64,
    pub cache_stats: EngineCacheStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub success: bool,
    pub estimate: Estimate,
    pub warnings: Vec<String>,
    pub performance: Performance,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchEstimateRequest {
    /// Raw items, so one malformed entry fails alone instead of rejecting the whole body.
    pub requests: Vec<serde_json::Value>,
    pub mode: EstimateMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub index: usize,
    pub estimate: Estimate,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub index: usize,
    pub error_class: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEstimateResponse {
    pub success: bool,
    pub mode: EstimateMode,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
    pub errors: Vec<BatchItemError>,
    pub performance: Performance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSettings {
    pub concurrency: usize,
    pub max_items: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { concurrency: 8, max_items: MAX_BATCH_ITEMS }
    }
}

impl From<&PricingConfig> for BatchSettings {
    fn from(config: &PricingConfig) -> Self {
        Self {
            concurrency: config.batch_concurrency,
            max_items: config.batch_max_items.min(MAX_BATCH_ITEMS),
        }
    }
}

/// Serves the estimate contract on top of a shared [`QuoteEngine`].
#[derive(Clone)]
pub struct EstimateService {
    engine: Arc<QuoteEngine>,
    reader: Option<Arc<dyn DescriptionReader>>,
    batch: BatchSettings,
}

impl EstimateService {
    pub fn new(engine: Arc<QuoteEngine>, batch: BatchSettings) -> Self {
        Self { engine, reader: None, batch }
    }

    pub fn with_reader(mut self, reader: Arc<dyn DescriptionReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn engine(&self) -> &Arc<QuoteEngine> {
        &self.engine
    }

    pub fn batch_settings(&self) -> BatchSettings {
        self.batch
    }

    pub async fn estimate(
        &self,
        request: &EstimateRequest,
        mode: EstimateMode,
    ) -> Result<EstimateResponse, PricingError> {
        let started = Instant::now();
        let catalog = self.engine.catalog().await?;
        let result = self.price(&catalog, request, mode)?;
        Ok(self.respond(result, started))
    }

    pub async fn estimate_batch(
        &self,
        request: BatchEstimateRequest,
    ) -> Result<BatchEstimateResponse, PricingError> {
        let started = Instant::now();
        let total = request.requests.len();
        if total > self.batch.max_items {
            return Err(PricingError::validation(
                "requests",
                format!("batch holds {total} items; at most {} are allowed", self.batch.max_items),
            ));
        }

        let catalog = self.engine.catalog().await?;
        let mode = request.mode;
        let service = self.clone();
        let outcomes = run_bounded(request.requests, self.batch.concurrency, move |index, raw| {
            let service = service.clone();
            let catalog = Arc::clone(&catalog);
            async move {
                let item: EstimateRequest = serde_json::from_value(raw).map_err(|error| {
                    PricingError::validation(format!("requests[{index}]"), error.to_string())
                })?;
                service.price(&catalog, &item, mode)
            }
        })
        .await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    let warnings = result.warnings.clone();
                    results.push(BatchItemResult { index, estimate: result.into(), warnings });
                }
                Err(error) => errors.push(BatchItemError {
                    index,
                    error_class: error.error_class().to_string(),
                    message: error.to_string(),
                }),
            }
        }

        info!(
            event_name = "pricing.estimate_batch.completed",
            mode = %mode,
            total,
            succeeded = results.len(),
            failed = errors.len(),
            "batch estimate completed"
        );

        Ok(BatchEstimateResponse {
            success: errors.is_empty(),
            mode,
            total,
            succeeded: results.len(),
            failed: errors.len(),
            results,
            errors,
            performance: self.performance(started),
        })
    }

    fn price(
        &self,
        catalog: &PriceCatalog,
        request: &EstimateRequest,
        mode: EstimateMode,
    ) -> Result<QuoteResult, PricingError> {
        let extracted = match (mode, &self.reader, non_blank(request.description.as_deref())) {
            (EstimateMode::Ai, Some(reader), Some(description)) if request.quantity.is_none() => {
                let quantity = reader.quantity(description);
                debug!(event_name = "pricing.estimate.quantity_extracted", ?quantity);
                quantity
            }
            _ => None,
        };
        let spec = request.to_specification(catalog, extracted)?;
        self.engine.quote_with(catalog, &spec)
    }

    fn respond(&self, result: QuoteResult, started: Instant) -> EstimateResponse {
        let warnings = result.warnings.clone();
        EstimateResponse {
            success: true,
            estimate: result.into(),
            warnings,
            performance: self.performance(started),
        }
    }

    fn performance(&self, started: Instant) -> Performance {
        Performance {
            response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            cache_stats: self.engine.cache_stats(),
        }
    }
}
