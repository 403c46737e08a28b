pub mod batch;
pub mod cache;
pub mod calculators;
pub mod catalog;
pub mod defaults;
pub mod logo_parser;
pub mod merge;
pub mod pricing;
pub mod repository;
pub mod tier;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PricingConfig;
use crate::domain::cost::QuoteResult;
use crate::domain::delta::PartialSpecificationDelta;
use crate::domain::specification::QuoteSpecification;
use crate::errors::PricingError;

use self::{
    cache::{CacheStats, PricingCache},
    calculators::{standard_calculators, ComponentCalculator, ComponentCost},
    catalog::{CachedPriceLookup, PriceCatalog},
    merge::{ConversationalMergeEngine, MergeOutcome},
    pricing::QuoteAggregator,
    repository::{InMemoryPriceTableSource, PriceTableRepository, RefreshReport},
    tier::ResolvedPrice,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
    pub delivery_fallback_unit_price: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 4_096,
            cache_ttl: Some(Duration::from_secs(900)),
            delivery_fallback_unit_price: Decimal::new(300, 2),
        }
    }
}

impl From<&PricingConfig> for EngineSettings {
    fn from(config: &PricingConfig) -> Self {
        Self {
            cache_capacity: config.cache_capacity,
            cache_ttl: config.cache_ttl(),
            delivery_fallback_unit_price: config.delivery_fallback_unit_price,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineCacheStats {
    pub lookups: CacheStats,
    pub quotes: CacheStats,
}

/// Prices specifications against the repository's current snapshot.
///
/// Holds no per-conversation state. The two caches are the only shared mutable state and both
/// are keyed by catalog version, so a refresh never serves prices from an older snapshot.
pub struct QuoteEngine {
    repository: Arc<PriceTableRepository>,
    calculators: Vec<Box<dyn ComponentCalculator>>,
    aggregator: QuoteAggregator,
    merger: ConversationalMergeEngine,
    lookups: PricingCache<String, Option<ResolvedPrice>>,
    quotes: PricingCache<String, QuoteResult>,
}

impl QuoteEngine {
    pub fn new(repository: Arc<PriceTableRepository>, settings: EngineSettings) -> Self {
        Self::with_calculators(
            repository,
            settings,
            standard_calculators(settings.delivery_fallback_unit_price),
        )
    }

    pub fn with_calculators(
        repository: Arc<PriceTableRepository>,
        settings: EngineSettings,
        calculators: Vec<Box<dyn ComponentCalculator>>,
    ) -> Self {
        Self {
            repository,
            calculators,
            aggregator: QuoteAggregator,
            merger: ConversationalMergeEngine::default(),
            lookups: PricingCache::new(settings.cache_capacity, settings.cache_ttl),
            quotes: PricingCache::new(settings.cache_capacity, settings.cache_ttl),
        }
    }

    /// Engine over the built-in tables, loaded eagerly.
    pub async fn builtin(settings: EngineSettings) -> Result<Self, PricingError> {
        let source = InMemoryPriceTableSource::new(defaults::default_tables()?);
        let repository =
            Arc::new(PriceTableRepository::new(Arc::new(source), Default::default()));
        repository.refresh().await?;
        Ok(Self::new(repository, settings))
    }

    pub fn repository(&self) -> &Arc<PriceTableRepository> {
        &self.repository
    }

    pub async fn catalog(&self) -> Result<Arc<PriceCatalog>, PricingError> {
        self.repository.ensure_loaded().await
    }

    pub async fn quote(&self, spec: &QuoteSpecification) -> Result<QuoteResult, PricingError> {
        let catalog = self.catalog().await?;
        self.quote_with(&catalog, spec)
    }

    /// Synchronous pricing against an already loaded snapshot.
    pub fn quote_with(
        &self,
        catalog: &PriceCatalog,
        spec: &QuoteSpecification,
    ) -> Result<QuoteResult, PricingError> {
        if spec.quantity == 0 {
            return Err(PricingError::validation("quantity", "must be greater than 0"));
        }

        let key = format!("v{}|{}", catalog.version(), spec.content_hash());
        if let Some(cached) = self.quotes.get(&key) {
            debug!(event_name = "pricing.quote.cache_hit", catalog_version = catalog.version());
            return Ok(cached);
        }

        let prices = CachedPriceLookup::new(catalog, &self.lookups);
        let mut lines = Vec::new();
        let mut notes = Vec::new();
        for calculator in &self.calculators {
            let ComponentCost { lines: component_lines, notes: component_notes } =
                calculator.calculate(spec, &prices);
            lines.extend(component_lines);
            notes.extend(component_notes);
        }

        let result = self.aggregator.aggregate(spec, lines, notes);
        self.quotes.insert(key, result.clone());
        Ok(result)
    }

    pub fn merge(
        &self,
        prior: Option<&QuoteSpecification>,
        delta: &PartialSpecificationDelta,
    ) -> MergeOutcome {
        self.merger.merge(prior, delta)
    }

    /// Reloads the tables. Caches are cleared only when a new snapshot was published.
    pub async fn refresh(&self) -> Result<RefreshReport, PricingError> {
        let report = self.repository.refresh().await?;
        if !report.stale {
            self.lookups.clear();
            self.quotes.clear();
        }
        Ok(report)
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats { lookups: self.lookups.stats(), quotes: self.quotes.stats() }
    }
}
