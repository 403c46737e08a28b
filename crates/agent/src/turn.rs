use std::sync::Arc;

use capquote_core::cpq::QuoteEngine;
use capquote_core::domain::delta::PartialSpecificationDelta;
use capquote_core::domain::specification::QuoteSpecification;
use capquote_core::errors::PricingError;
use capquote_core::estimate::Estimate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::quantity::QuantityExtractor;

/// One conversational turn: the prior specification held by the caller, the user's message,
/// and the structured delta an upstream extractor produced from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnRequest {
    pub prior: Option<QuoteSpecification>,
    pub message: Option<String>,
    pub delta: Option<PartialSpecificationDelta>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub spec: QuoteSpecification,
    pub change_log: Vec<String>,
    pub notes: Vec<String>,
    pub estimate: Estimate,
    pub warnings: Vec<String>,
}

/// Merges a turn onto the prior specification and prices the result.
///
/// Holds no conversation state; the caller stores the returned specification and passes it
/// back as `prior` on the next turn.
pub struct ConversationTurnHandler {
    engine: Arc<QuoteEngine>,
    extractor: QuantityExtractor,
}

impl ConversationTurnHandler {
    pub fn new(engine: Arc<QuoteEngine>) -> Self {
        Self { engine, extractor: QuantityExtractor }
    }

    pub async fn handle(&self, request: TurnRequest) -> Result<TurnResponse, PricingError> {
        let TurnRequest { prior, message, delta } = request;
        let mut delta = delta.unwrap_or_default();
        let mut notes = Vec::new();

        let message = message.as_deref().map(str::trim).filter(|message| !message.is_empty());
        if let (None, Some(message)) = (delta.quantity, message) {
            let reading = self.extractor.read(message);
            match (reading.quantity, reading.rule) {
                (Some(quantity), Some(rule)) => {
                    debug!(event_name = "agent.turn.quantity_read", quantity, rule = %rule);
                    notes.push(format!("Read quantity {quantity} from the message ({rule})"));
                    delta.quantity = Some(quantity);
                }
                _ => {
                    if prior.is_none() || reading.ambiguous {
                        notes.extend(reading.note);
                    }
                }
            }
        }

        let outcome = self.engine.merge(prior.as_ref(), &delta);
        notes.extend(outcome.notes);

        let result = self.engine.quote(&outcome.spec).await?;
        info!(
            event_name = "agent.turn.completed",
            fresh = prior.is_none(),
            changes = outcome.change_log.len(),
            warnings = result.warnings.len(),
            "conversation turn priced"
        );

        let warnings = result.warnings.clone();
        Ok(TurnResponse {
            spec: outcome.spec,
            change_log: outcome.change_log,
            notes,
            estimate: result.into(),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use capquote_core::cpq::{EngineSettings, QuoteEngine};
    use capquote_core::domain::delta::{ListEdit, PartialSpecificationDelta};
    use capquote_core::domain::logo::{ApplicationMethod, DecorationMethod, LogoSize, LogoSpec};
    use capquote_core::domain::specification::{FabricSelection, QuoteSpecification};
    use rust_decimal::Decimal;

    use super::{ConversationTurnHandler, TurnRequest};

    async fn handler() -> ConversationTurnHandler {
        let engine = QuoteEngine::builtin(EngineSettings::default()).await.expect("engine");
        ConversationTurnHandler::new(Arc::new(engine))
    }

    fn prior() -> QuoteSpecification {
        QuoteSpecification {
            quantity: 600,
            fabric: FabricSelection::parse("Polyester"),
            logos: vec![LogoSpec::simple(
                "Front",
                DecorationMethod::LaserCut,
                LogoSize::Large,
                ApplicationMethod::Direct,
            )],
            ..QuoteSpecification::default()
        }
    }

    #[tokio::test]
    async fn message_quantity_keeps_everything_else() {
        let response = handler()
            .await
            .handle(TurnRequest {
                prior: Some(prior()),
                message: Some("make it 150 pieces".to_string()),
                delta: None,
            })
            .await
            .expect("turn");

        assert_eq!(response.spec.quantity, 150);
        assert_eq!(response.spec.logos, prior().logos);
        assert_eq!(response.spec.fabric, prior().fabric);
        assert_eq!(response.change_log, vec!["Quantity: 600 → 150"]);
        assert_eq!(response.estimate.subtotal, Decimal::new(119_400, 2));
    }

    #[tokio::test]
    async fn structured_quantity_wins_over_the_message() {
        let response = handler()
            .await
            .handle(TurnRequest {
                prior: Some(prior()),
                message: Some("make it 150 pieces".to_string()),
                delta: Some(PartialSpecificationDelta::quantity(288)),
            })
            .await
            .expect("turn");

        assert_eq!(response.spec.quantity, 288);
        assert!(response.notes.iter().all(|note| !note.contains("Read quantity")));
    }

    #[tokio::test]
    async fn fresh_conversation_without_a_quantity_asks_for_one() {
        let response = handler()
            .await
            .handle(TurnRequest {
                prior: None,
                message: Some("add a leather patch on the back".to_string()),
                delta: Some(PartialSpecificationDelta {
                    accessories: Some(ListEdit::add(vec!["Hang Tag".to_string()])),
                    ..PartialSpecificationDelta::default()
                }),
            })
            .await
            .expect("turn");

        assert_eq!(response.spec.quantity, 48);
        assert_eq!(response.spec.accessories, vec!["Hang Tag"]);
        assert!(response.notes.iter().any(|note| note.contains("how many caps")));
    }
}
