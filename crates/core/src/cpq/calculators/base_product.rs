use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

#[derive(Clone, Copy, Debug, Default)]
pub struct BaseProductCalculator;

impl ComponentCalculator for BaseProductCalculator {
    fn component(&self) -> Component {
        Component::BaseProduct
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let tier = spec.product_tier.trim();
        let name = format!("Base Cap ({tier})");
        let line = match prices.unit_price(ItemType::Product, tier, spec.quantity) {
            Some(price) => CostLineItem::priced(
                Component::BaseProduct,
                name,
                spec.quantity,
                price,
                format!("{tier} at the {}+ break", price.tier_used),
            ),
            None => CostLineItem::not_found(
                Component::BaseProduct,
                name,
                spec.quantity,
                format!("product tier `{tier}` is not in the price tables; priced at 0"),
            ),
        };
        ComponentCost::line(line)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::BaseProductCalculator;
    use crate::cpq::calculators::test_support::builtin_catalog;
    use crate::cpq::calculators::ComponentCalculator;
    use crate::domain::specification::QuoteSpecification;

    #[test]
    fn base_cost_is_unit_price_times_quantity() {
        let spec = QuoteSpecification { quantity: 150, ..QuoteSpecification::default() };
        let cost = BaseProductCalculator.calculate(&spec, &builtin_catalog());

        let line = &cost.lines[0];
        assert_eq!(line.unit_price, Decimal::new(425, 2));
        assert_eq!(line.total_cost, Decimal::new(63_750, 2));
        assert_eq!(line.tier_used, Some(144));
    }

    #[test]
    fn unknown_tier_is_a_zero_cost_line() {
        let spec = QuoteSpecification {
            product_tier: "Tier 9".to_string(),
            ..QuoteSpecification::default()
        };
        let cost = BaseProductCalculator.calculate(&spec, &builtin_catalog());
        assert!(!cost.lines[0].found);
        assert_eq!(cost.lines[0].total_cost, Decimal::ZERO);
    }
}
