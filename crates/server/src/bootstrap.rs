use std::sync::Arc;

use capquote_agent::{ConversationTurnHandler, QuantityExtractor};
use capquote_core::config::{AppConfig, ConfigError, LoadOptions};
use capquote_core::cpq::repository::{PriceTableRepository, RefreshPolicy};
use capquote_core::cpq::{EngineSettings, QuoteEngine};
use capquote_core::errors::PricingError;
use capquote_core::estimate::{BatchSettings, EstimateService};
use capquote_db::{open_table_source, DbPool, SourceError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub engine: Arc<QuoteEngine>,
    pub estimates: EstimateService,
    pub turns: Arc<ConversationTurnHandler>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    TableSource(#[from] SourceError),
    #[error("initial price table load failed: {0}")]
    InitialLoad(#[source] PricingError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let opened = open_table_source(&config).await?;
    info!(
        event_name = "system.bootstrap.table_source_ready",
        correlation_id = "bootstrap",
        source = %opened.source.describe(),
        "price table source ready"
    );

    let repository =
        Arc::new(PriceTableRepository::new(opened.source, RefreshPolicy::from(&config.pricing)));
    let report = repository.refresh().await.map_err(BootstrapError::InitialLoad)?;
    info!(
        event_name = "system.bootstrap.tables_loaded",
        correlation_id = "bootstrap",
        version = report.version,
        table_count = report.table_count,
        "price tables loaded"
    );

    let engine = Arc::new(QuoteEngine::new(repository, EngineSettings::from(&config.pricing)));
    let estimates = EstimateService::new(Arc::clone(&engine), BatchSettings::from(&config.pricing))
        .with_reader(Arc::new(QuantityExtractor::new()));
    let turns = Arc::new(ConversationTurnHandler::new(Arc::clone(&engine)));

    Ok(Application { config, db_pool: opened.pool, engine, estimates, turns })
}
