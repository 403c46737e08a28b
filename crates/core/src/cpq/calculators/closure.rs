use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

#[derive(Clone, Copy, Debug, Default)]
pub struct ClosureCalculator;

impl ComponentCalculator for ClosureCalculator {
    fn component(&self) -> Component {
        Component::Closure
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let closure = spec.closure.trim();
        let name = format!("Closure ({closure})");
        let line = match prices.unit_price(ItemType::Closure, closure, spec.quantity) {
            Some(price) => CostLineItem::priced(Component::Closure, name, spec.quantity, price, ""),
            None => CostLineItem::not_found(
                Component::Closure,
                name,
                spec.quantity,
                format!("closure `{closure}` is not in the price tables; priced at 0"),
            ),
        };
        ComponentCost::line(line)
    }
}
