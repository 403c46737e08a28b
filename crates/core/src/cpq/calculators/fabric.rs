use rust_decimal::Decimal;

use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::cpq::defaults::is_free_fabric;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

/// Premium fabric surcharge. A split selection `"A/B"` is priced as the sum of both sides,
/// each resolved on its own; a side with no table contributes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct PremiumFabricCalculator;

impl ComponentCalculator for PremiumFabricCalculator {
    fn component(&self) -> Component {
        Component::PremiumFabric
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let Some(fabric) = &spec.fabric else {
            return ComponentCost::default();
        };

        let mut unit_price = Decimal::ZERO;
        let mut tier_used = None;
        let mut details = Vec::new();
        let mut notes = Vec::new();
        let mut resolved_sides = 0;

        for side in fabric.parts() {
            if is_free_fabric(side) {
                resolved_sides += 1;
                details.push(format!("{side}: included"));
                continue;
            }
            match prices.unit_price(ItemType::Fabric, side, spec.quantity) {
                Some(price) => {
                    resolved_sides += 1;
                    unit_price += price.unit_price;
                    tier_used = tier_used.or(Some(price.tier_used));
                    details.push(format!("{side}: {}", price.unit_price));
                }
                None => {
                    details.push(format!("{side}: not priced"));
                    notes.push(format!("fabric `{side}` is not in the price tables; priced at 0"));
                }
            }
        }

        let line = CostLineItem {
            component: Component::PremiumFabric,
            name: format!("Premium Fabric ({fabric})"),
            quantity: spec.quantity,
            unit_price,
            total_cost: unit_price * Decimal::from(spec.quantity),
            tier_used,
            details: details.join("; "),
            found: resolved_sides > 0,
        };
        ComponentCost { lines: vec![line], notes }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::PremiumFabricCalculator;
    use crate::cpq::calculators::test_support::builtin_catalog;
    use crate::cpq::calculators::ComponentCalculator;
    use crate::domain::specification::{FabricSelection, QuoteSpecification};

    fn with_fabric(fabric: &str) -> QuoteSpecification {
        QuoteSpecification {
            quantity: 150,
            fabric: FabricSelection::parse(fabric),
            ..QuoteSpecification::default()
        }
    }

    #[test]
    fn split_fabric_sums_both_sides() {
        let catalog = builtin_catalog();
        let split = PremiumFabricCalculator.calculate(&with_fabric("Polyester/Laser Cut"), &catalog);
        let laser = PremiumFabricCalculator.calculate(&with_fabric("Laser Cut"), &catalog);
        let free = PremiumFabricCalculator.calculate(&with_fabric("Polyester"), &catalog);

        assert_eq!(free.lines[0].unit_price, Decimal::ZERO);
        assert_eq!(split.lines[0].unit_price, free.lines[0].unit_price + laser.lines[0].unit_price);
        assert_eq!(split.lines[0].unit_price, Decimal::new(75, 2));
        assert_eq!(split.lines[0].total_cost, Decimal::new(11_250, 2));
    }

    #[test]
    fn two_premium_sides_are_resolved_independently() {
        let cost = PremiumFabricCalculator.calculate(&with_fabric("Suede/Camo"), &builtin_catalog());
        assert_eq!(cost.lines[0].unit_price, Decimal::new(205, 2));
    }

    #[test]
    fn missing_side_contributes_nothing() {
        let cost = PremiumFabricCalculator
            .calculate(&with_fabric("Suede/Unobtainium"), &builtin_catalog());
        assert_eq!(cost.lines[0].unit_price, Decimal::new(140, 2));
        assert!(cost.lines[0].found);
        assert_eq!(cost.notes.len(), 1);
    }

    #[test]
    fn no_fabric_means_no_line() {
        let cost = PremiumFabricCalculator
            .calculate(&QuoteSpecification::default(), &builtin_catalog());
        assert!(cost.lines.is_empty());
    }
}
