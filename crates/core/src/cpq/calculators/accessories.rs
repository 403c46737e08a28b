use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

/// One line per named accessory, in specification order.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessoriesCalculator;

impl ComponentCalculator for AccessoriesCalculator {
    fn component(&self) -> Component {
        Component::Accessories
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let lines = spec
            .accessories
            .iter()
            .map(|accessory| accessory.trim())
            .filter(|accessory| !accessory.is_empty())
            .map(|accessory| price_accessory(accessory, spec.quantity, prices))
            .collect();
        ComponentCost { lines, notes: Vec::new() }
    }
}

fn price_accessory(accessory: &str, quantity: u32, prices: &dyn PriceLookup) -> CostLineItem {
    match prices.unit_price(ItemType::Accessory, accessory, quantity) {
        Some(price) => CostLineItem::priced(Component::Accessories, accessory, quantity, price, ""),
        None => CostLineItem::not_found(
            Component::Accessories,
            accessory,
            quantity,
            format!("accessory `{accessory}` is not in the price tables; priced at 0"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::AccessoriesCalculator;
    use crate::cpq::calculators::test_support::builtin_catalog;
    use crate::cpq::calculators::ComponentCalculator;
    use crate::domain::specification::QuoteSpecification;

    #[test]
    fn each_accessory_gets_its_own_line() {
        let spec = QuoteSpecification {
            quantity: 150,
            accessories: ["Hang Tag", "Gold Pin", "Sticker"].map(String::from).to_vec(),
            ..QuoteSpecification::default()
        };
        let cost = AccessoriesCalculator.calculate(&spec, &builtin_catalog());

        let names = cost.lines.iter().map(|line| line.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Hang Tag", "Gold Pin", "Sticker"]);
        assert_eq!(cost.lines[0].total_cost, Decimal::new(6_000, 2));
        assert!(!cost.lines[1].found);
    }
}
