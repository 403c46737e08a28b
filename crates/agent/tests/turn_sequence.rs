use std::sync::Arc;

use capquote_agent::{ConversationTurnHandler, TurnRequest};
use capquote_core::cpq::{EngineSettings, QuoteEngine};
use capquote_core::domain::delta::{ListEdit, PartialSpecificationDelta};
use capquote_core::domain::logo::{LogoDescriptor, LogoSpec};
use serde_json::json;

#[tokio::test]
async fn multi_turn_conversation_never_drops_earlier_choices() {
    let engine = QuoteEngine::builtin(EngineSettings::default()).await.expect("engine");
    let handler = ConversationTurnHandler::new(Arc::new(engine));

    let first = handler
        .handle(TurnRequest {
            prior: None,
            message: Some("300 black and 300 navy".to_string()),
            delta: Some(PartialSpecificationDelta {
                logos: Some(ListEdit::add(vec![
                    LogoSpec::new("Front", LogoDescriptor::composite("Large + 3D Embroidery")),
                    LogoSpec::new("Back", LogoDescriptor::composite("Small Rubber Patch")),
                ])),
                fabric: Some("Polyester/Laser Cut".to_string()),
                ..PartialSpecificationDelta::default()
            }),
        })
        .await
        .expect("first turn");
    assert_eq!(first.spec.quantity, 600);
    assert_eq!(first.spec.logos.len(), 2);

    let second = handler
        .handle(TurnRequest {
            prior: Some(first.spec.clone()),
            message: Some("actually make it 150 pieces".to_string()),
            delta: None,
        })
        .await
        .expect("second turn");
    assert_eq!(second.spec.quantity, 150);
    assert_eq!(second.spec.logos, first.spec.logos);
    assert_eq!(second.spec.fabric, first.spec.fabric);
    assert_eq!(second.spec.closure, first.spec.closure);

    let third = handler
        .handle(
            serde_json::from_value::<TurnRequest>(json!({
                "prior": second.spec,
                "delta": { "logos": { "op": "REMOVE", "items": [{ "position": "Back" }] } }
            }))
            .expect("request"),
        )
        .await
        .expect("third turn");
    let positions: Vec<&str> = third.spec.logos.iter().map(|logo| logo.position.as_str()).collect();
    assert_eq!(positions, vec!["Front"]);
    assert!(third.estimate.line_items.iter().all(|line| !line.name.starts_with("Mold")));
}
