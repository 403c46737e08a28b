use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use capquote_agent::QuantityExtractor;
use capquote_core::estimate::{
    BatchSettings, EstimateMode, EstimateRequest, EstimateService, LogoRequest,
};
use clap::Args;
use tracing::info;

use crate::commands::{execute, open_engine, CommandResult, Failure};

#[derive(Debug, Clone, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Read an estimate request JSON document instead of flags")]
    pub request: Option<PathBuf>,
    #[arg(long, allow_negative_numbers = true, help = "Total cap count")]
    pub quantity: Option<i64>,
    #[arg(long, help = "Product tier, e.g. \"Tier 2\"")]
    pub tier: Option<String>,
    #[arg(long, help = "Free-text order description")]
    pub description: Option<String>,
    #[arg(long, help = "Fabric name; `A/B` for a split fabric")]
    pub fabric: Option<String>,
    #[arg(long)]
    pub closure: Option<String>,
    #[arg(long)]
    pub delivery: Option<String>,
    #[arg(long = "accessory", help = "Accessory name (repeatable)")]
    pub accessories: Vec<String>,
    #[arg(long = "color", help = "Cap colour (repeatable)")]
    pub colors: Vec<String>,
    #[arg(
        long = "logo",
        help = "TYPE[:SIZE[:APPLICATION[:POSITION]]] (repeatable), e.g. \"Laser Cut:Large::Front\""
    )]
    pub logos: Vec<String>,
    #[arg(long, default_value = "standard", help = "standard | ai")]
    pub mode: EstimateMode,
}

impl QuoteArgs {
    pub fn to_request(&self) -> Result<EstimateRequest, String> {
        if let Some(path) = &self.request {
            let raw = fs::read_to_string(path)
                .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
            return serde_json::from_str(&raw).map_err(|error| {
                format!("`{}` is not an estimate request: {error}", path.display())
            });
        }

        Ok(EstimateRequest {
            quantity: self.quantity,
            tier: self.tier.clone(),
            description: self.description.clone(),
            logos: self.logos.iter().map(|raw| parse_logo(raw)).collect(),
            fabric: self.fabric.clone(),
            closure: self.closure.clone(),
            accessories: self.accessories.clone(),
            delivery: self.delivery.clone(),
            colors: self.colors.clone(),
        })
    }
}

fn parse_logo(raw: &str) -> LogoRequest {
    let mut parts = raw.split(':').map(str::trim);
    let mut next = || parts.next().filter(|part| !part.is_empty()).map(str::to_string);
    LogoRequest { kind: next(), size: next(), application: next(), position: next() }
}

pub fn run(args: QuoteArgs) -> CommandResult {
    execute("quote", |config| async move {
        let request = args.to_request().map_err(|message| ("invalid_request", message, 2u8))?;
        let (engine, pool) = open_engine(&config).await?;
        let service = EstimateService::new(engine, BatchSettings::from(&config.pricing))
            .with_reader(Arc::new(QuantityExtractor::new()));

        let response = service
            .estimate(&request, args.mode)
            .await
            .map_err(|error| (error.error_class(), error.to_string(), 5u8))?;
        if let Some(pool) = pool {
            pool.close().await;
        }

        info!(
            event_name = "cli.quote.completed",
            quantity = response.estimate.spec.quantity,
            subtotal = %response.estimate.subtotal,
            "quote priced"
        );
        Ok::<_, Failure>(CommandResult::document("quote", &response))
    })
}
