//! Applies a sparse conversational delta onto the previous specification.
//!
//! Fields the delta does not mention are carried forward untouched. A delta that only sets the
//! quantity therefore never resets logos, fabric, closure or accessories.

use serde::{Deserialize, Serialize};

use crate::cpq::logo_parser::LogoSpecParser;
use crate::domain::delta::{ListEdit, ListOp, PartialSpecificationDelta};
use crate::domain::logo::{LogoDescriptor, LogoSpec};
use crate::domain::price_table::normalize_name;
use crate::domain::specification::{
    FabricSelection, QuoteSpecification, DEFAULT_CLOSURE, DEFAULT_DELIVERY_METHOD,
    DEFAULT_PRODUCT_TIER, DEFAULT_QUANTITY,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub spec: QuoteSpecification,
    /// Human-readable echo of what changed, e.g. `"Quantity: 600 → 150"`.
    pub change_log: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConversationalMergeEngine {
    parser: LogoSpecParser,
}

impl ConversationalMergeEngine {
    pub fn merge(
        &self,
        prior: Option<&QuoteSpecification>,
        delta: &PartialSpecificationDelta,
    ) -> MergeOutcome {
        let mut change_log = Vec::new();
        let mut notes = Vec::new();
        let fresh = prior.is_none();

        let mut spec = match prior {
            Some(prior) => prior.clone(),
            None => {
                notes.extend(default_notes(delta));
                QuoteSpecification::default()
            }
        };

        if let Some(quantity) = delta.quantity {
            if quantity == 0 {
                notes.push(format!("quantity must be at least 1; keeping {}", spec.quantity));
            } else {
                let (before, after) = (spec.quantity.to_string(), quantity.to_string());
                record(&mut change_log, fresh, "Quantity", &before, &after);
                spec.quantity = quantity;
            }
        }

        if let Some(tier) = non_blank(delta.product_tier.as_deref(), "product tier", &mut notes) {
            record(&mut change_log, fresh, "Product tier", &spec.product_tier, tier);
            spec.product_tier = tier.to_string();
        }

        if let Some(raw) = &delta.fabric {
            let (next, extra) = FabricSelection::parse_with_extra(raw);
            if !extra.is_empty() {
                notes.push(format!("at most two fabrics are priced; ignored {}", extra.join(", ")));
            }
            let before = describe_fabric(spec.fabric.as_ref());
            let after = describe_fabric(next.as_ref());
            record(&mut change_log, fresh, "Fabric", &before, &after);
            spec.fabric = next;
        }

        if let Some(closure) = non_blank(delta.closure.as_deref(), "closure", &mut notes) {
            record(&mut change_log, fresh, "Closure", &spec.closure, closure);
            spec.closure = closure.to_string();
        }

        if let Some(method) =
            non_blank(delta.delivery_method.as_deref(), "delivery method", &mut notes)
        {
            record(&mut change_log, fresh, "Delivery", &spec.delivery_method, method);
            spec.delivery_method = method.to_string();
        }

        if let Some(edit) = &delta.colors {
            spec.colors = apply_list(
                "Colors",
                std::mem::take(&mut spec.colors),
                &trimmed(edit),
                |color| normalize_name(color),
                |color| color.clone(),
                &mut change_log,
                &mut notes,
            );
        }

        if let Some(edit) = &delta.accessories {
            spec.accessories = apply_list(
                "Accessories",
                std::mem::take(&mut spec.accessories),
                &trimmed(edit),
                |accessory| normalize_name(accessory),
                |accessory| accessory.clone(),
                &mut change_log,
                &mut notes,
            );
        }

        let logos = match &delta.logos {
            Some(edit) => {
                let items = self.normalize_logos(&edit.items, &mut notes);
                let edit = ListEdit { op: edit.op, items };
                apply_list(
                    "Logos",
                    std::mem::take(&mut spec.logos),
                    &edit,
                    |logo| normalize_name(&logo.position),
                    describe_logo,
                    &mut change_log,
                    &mut notes,
                )
            }
            None => std::mem::take(&mut spec.logos),
        };
        spec.logos = self.normalize_logos(&logos, &mut notes);

        MergeOutcome { spec, change_log, notes }
    }

    fn normalize_logos(&self, logos: &[LogoSpec], notes: &mut Vec<String>) -> Vec<LogoSpec> {
        logos
            .iter()
            .map(|logo| {
                let position = logo.position.trim().to_string();
                match &logo.descriptor {
                    LogoDescriptor::Simple(_) => LogoSpec::new(position, logo.descriptor.clone()),
                    LogoDescriptor::Composite(_) => {
                        let parsed = self.parser.resolve(&logo.descriptor);
                        notes.extend(
                            parsed.notes.into_iter().map(|note| format!("{position} logo: {note}")),
                        );
                        LogoSpec::new(position, LogoDescriptor::Simple(parsed.logo))
                    }
                }
            })
            .collect()
    }
}

fn default_notes(delta: &PartialSpecificationDelta) -> Vec<String> {
    let mut notes = Vec::new();
    if delta.quantity.is_none() {
        notes.push(format!("quantity not specified; defaulted to {DEFAULT_QUANTITY}"));
    }
    if delta.product_tier.is_none() {
        notes.push(format!("product tier not specified; defaulted to {DEFAULT_PRODUCT_TIER}"));
    }
    if delta.fabric.is_none() {
        notes.push("fabric not specified; no premium fabric".to_string());
    }
    if delta.closure.is_none() {
        notes.push(format!("closure not specified; defaulted to {DEFAULT_CLOSURE}"));
    }
    if delta.delivery_method.is_none() {
        notes.push(format!("delivery not specified; defaulted to {DEFAULT_DELIVERY_METHOD}"));
    }
    notes
}

fn record(change_log: &mut Vec<String>, fresh: bool, field: &str, before: &str, after: &str) {
    if fresh {
        change_log.push(format!("{field}: {after}"));
    } else if before != after {
        change_log.push(format!("{field}: {before} → {after}"));
    }
}

fn non_blank<'a>(
    value: Option<&'a str>,
    field: &str,
    notes: &mut Vec<String>,
) -> Option<&'a str> {
    let value = value?.trim();
    if value.is_empty() {
        notes.push(format!("ignored empty {field}"));
        return None;
    }
    Some(value)
}

fn describe_fabric(fabric: Option<&FabricSelection>) -> String {
    fabric.map_or_else(|| "none".to_string(), ToString::to_string)
}

fn describe_logo(logo: &LogoSpec) -> String {
    match &logo.descriptor {
        LogoDescriptor::Simple(resolved) => format!("{} ({resolved})", logo.position),
        LogoDescriptor::Composite(composite) => {
            format!("{} ({})", logo.position, composite.raw_tokens.join(" + "))
        }
    }
}

fn trimmed(edit: &ListEdit<String>) -> ListEdit<String> {
    ListEdit {
        op: edit.op,
        items: edit
            .items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    }
}

fn apply_list<T: Clone + PartialEq>(
    label: &str,
    mut current: Vec<T>,
    edit: &ListEdit<T>,
    identity: impl Fn(&T) -> String,
    describe: impl Fn(&T) -> String,
    change_log: &mut Vec<String>,
    notes: &mut Vec<String>,
) -> Vec<T> {
    match edit.op {
        ListOp::Add => {
            for item in &edit.items {
                let key = identity(item);
                match current.iter_mut().find(|existing| identity(existing) == key) {
                    Some(existing) if *existing == *item => {}
                    Some(existing) => {
                        change_log.push(format!(
                            "{label}: {} → {}",
                            describe(existing),
                            describe(item)
                        ));
                        *existing = item.clone();
                    }
                    None => {
                        change_log.push(format!("{label}: added {}", describe(item)));
                        current.push(item.clone());
                    }
                }
            }
            current
        }
        ListOp::Remove => {
            for item in &edit.items {
                let key = identity(item);
                let before = current.len();
                current.retain(|existing| identity(existing) != key);
                if current.len() == before {
                    notes.push(format!(
                        "{label}: `{}` was not present; nothing removed",
                        describe(item)
                    ));
                } else {
                    change_log.push(format!("{label}: removed {}", describe(item)));
                }
            }
            current
        }
        ListOp::ReplaceAll => {
            let before = current.iter().map(&describe).collect::<Vec<_>>().join(", ");
            let after = edit.items.iter().map(&describe).collect::<Vec<_>>().join(", ");
            if before != after {
                change_log.push(format!("{label}: [{before}] → [{after}]"));
            }
            edit.items.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationalMergeEngine;
    use crate::domain::delta::{ListEdit, PartialSpecificationDelta};
    use crate::domain::logo::{
        ApplicationMethod, DecorationMethod, LogoDescriptor, LogoSize, LogoSpec, ResolvedLogo,
    };
    use crate::domain::specification::{FabricSelection, QuoteSpecification};

    fn logo(position: &str, decoration: DecorationMethod) -> LogoSpec {
        LogoSpec::simple(position, decoration, LogoSize::Medium, ApplicationMethod::Direct)
    }

    fn prior() -> QuoteSpecification {
        QuoteSpecification {
            quantity: 600,
            product_tier: "Tier 2".to_string(),
            colors: vec!["Black".to_string()],
            fabric: FabricSelection::parse("Suede"),
            logos: vec![
                logo("Front", DecorationMethod::ThreeDEmbroidery),
                logo("Back", DecorationMethod::FlatEmbroidery),
            ],
            closure: "Fitted".to_string(),
            accessories: vec!["Hang Tag".to_string()],
            delivery_method: "Priority Delivery".to_string(),
        }
    }

    #[test]
    fn quantity_only_delta_preserves_every_other_field() {
        let prior = prior();
        let outcome = ConversationalMergeEngine::default()
            .merge(Some(&prior), &PartialSpecificationDelta::quantity(150));

        let expected = QuoteSpecification { quantity: 150, ..prior };
        assert_eq!(outcome.spec, expected);
        assert_eq!(outcome.change_log, vec!["Quantity: 600 → 150"]);
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let prior = QuoteSpecification {
            logos: vec![
                logo("Front", DecorationMethod::LaserCut),
                logo("Back", DecorationMethod::LaserCut),
                logo("Left", DecorationMethod::LaserCut),
            ],
            ..QuoteSpecification::default()
        };
        let delta = PartialSpecificationDelta {
            logos: Some(ListEdit::remove(vec![LogoSpec::new("back", LogoDescriptor::default())])),
            ..PartialSpecificationDelta::default()
        };

        let outcome = ConversationalMergeEngine::default().merge(Some(&prior), &delta);
        let positions =
            outcome.spec.logos.iter().map(|logo| logo.position.as_str()).collect::<Vec<_>>();
        assert_eq!(positions, vec!["Front", "Left"]);
    }

    #[test]
    fn add_appends_new_items_and_updates_existing_ones_in_place() {
        let delta = PartialSpecificationDelta {
            accessories: Some(ListEdit::add(vec!["Sticker".to_string(), "hang tag".to_string()])),
            logos: Some(ListEdit::add(vec![logo("Front", DecorationMethod::RubberPatch)])),
            ..PartialSpecificationDelta::default()
        };
        let outcome = ConversationalMergeEngine::default().merge(Some(&prior()), &delta);

        assert_eq!(outcome.spec.accessories, vec!["hang tag", "Sticker"]);
        assert_eq!(outcome.spec.logos.len(), 2);
        assert_eq!(outcome.spec.logos[0], logo("Front", DecorationMethod::RubberPatch));
        assert!(outcome.change_log.iter().any(|entry| entry.starts_with("Logos: Front")));
    }

    #[test]
    fn replace_all_swaps_the_list() {
        let delta = PartialSpecificationDelta {
            colors: Some(ListEdit::replace_all(vec!["Navy".to_string(), "White".to_string()])),
            ..PartialSpecificationDelta::default()
        };
        let outcome = ConversationalMergeEngine::default().merge(Some(&prior()), &delta);
        assert_eq!(outcome.spec.colors, vec!["Navy", "White"]);
        assert_eq!(outcome.change_log, vec!["Colors: [Black] → [Navy, White]"]);
    }

    #[test]
    fn removing_an_absent_item_is_a_noop_with_a_note() {
        let delta = PartialSpecificationDelta {
            accessories: Some(ListEdit::remove(vec!["Sticker".to_string()])),
            ..PartialSpecificationDelta::default()
        };
        let prior = prior();
        let outcome = ConversationalMergeEngine::default().merge(Some(&prior), &delta);
        assert_eq!(outcome.spec, prior);
        assert_eq!(outcome.notes.len(), 1);
    }

    #[test]
    fn fresh_specification_is_filled_with_defaults() {
        let outcome = ConversationalMergeEngine::default().merge(
            None,
            &PartialSpecificationDelta {
                fabric: Some("Polyester/Laser Cut".to_string()),
                ..PartialSpecificationDelta::default()
            },
        );

        assert_eq!(outcome.spec.quantity, 48);
        assert_eq!(outcome.spec.product_tier, "Tier 1");
        assert_eq!(outcome.spec.closure, "Snapback");
        assert_eq!(outcome.spec.delivery_method, "Regular Delivery");
        assert!(outcome.spec.fabric.as_ref().is_some_and(FabricSelection::is_split));
        assert_eq!(outcome.notes.len(), 4, "quantity, tier, closure and delivery defaulted");
        assert_eq!(outcome.change_log, vec!["Fabric: Polyester/Laser Cut"]);
    }

    #[test]
    fn zero_quantity_is_rejected_and_prior_kept() {
        let outcome = ConversationalMergeEngine::default()
            .merge(Some(&prior()), &PartialSpecificationDelta::quantity(0));
        assert_eq!(outcome.spec.quantity, 600);
        assert!(outcome.notes[0].contains("at least 1"));
    }

    #[test]
    fn fresh_zero_quantity_gets_a_single_note() {
        let outcome = ConversationalMergeEngine::default()
            .merge(None, &PartialSpecificationDelta::quantity(0));

        assert_eq!(outcome.spec.quantity, 48);
        let quantity_notes =
            outcome.notes.iter().filter(|note| note.contains("quantity")).collect::<Vec<_>>();
        assert_eq!(quantity_notes, vec!["quantity must be at least 1; keeping 48"]);
    }

    #[test]
    fn third_fabric_is_dropped_with_a_note() {
        let delta = PartialSpecificationDelta {
            fabric: Some("Polyester/Laser Cut/Suede".to_string()),
            ..PartialSpecificationDelta::default()
        };
        let outcome = ConversationalMergeEngine::default().merge(Some(&prior()), &delta);

        assert_eq!(
            outcome.spec.fabric.as_ref().map(ToString::to_string).as_deref(),
            Some("Polyester/Laser Cut")
        );
        assert!(outcome.notes.iter().any(|note| note.contains("ignored Suede")));
        assert_eq!(outcome.change_log, vec!["Fabric: Suede → Polyester/Laser Cut"]);
    }

    #[test]
    fn composite_logos_are_normalised_to_simple() {
        let delta = PartialSpecificationDelta {
            logos: Some(ListEdit::add(vec![LogoSpec::new(
                "Side",
                LogoDescriptor::composite("Small + Woven Patch + Velcro"),
            )])),
            ..PartialSpecificationDelta::default()
        };
        let outcome = ConversationalMergeEngine::default().merge(Some(&prior()), &delta);

        assert_eq!(
            outcome.spec.logos[2].descriptor,
            LogoDescriptor::Simple(ResolvedLogo::new(
                DecorationMethod::WovenPatch,
                LogoSize::Small,
                ApplicationMethod::Velcro
            ))
        );
    }

    #[test]
    fn merge_is_pure() {
        let prior = prior();
        let delta = PartialSpecificationDelta {
            closure: Some("Snapback".to_string()),
            ..PartialSpecificationDelta::quantity(300)
        };
        let engine = ConversationalMergeEngine::default();
        assert_eq!(engine.merge(Some(&prior), &delta), engine.merge(Some(&prior), &delta));
        assert_eq!(prior.quantity, 600);
    }
}
