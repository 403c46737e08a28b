use rust_decimal::Decimal;
use tracing::warn;

use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

/// Delivery per unit. A method with no table falls back to a flat unit price and the line
/// is flagged as degraded.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryCalculator {
    fallback_unit_price: Decimal,
}

impl DeliveryCalculator {
    pub fn new(fallback_unit_price: Decimal) -> Self {
        Self { fallback_unit_price }
    }
}

impl ComponentCalculator for DeliveryCalculator {
    fn component(&self) -> Component {
        Component::Delivery
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let method = spec.delivery_method.trim();
        let name = format!("Delivery ({method})");

        if let Some(price) = prices.unit_price(ItemType::Delivery, method, spec.quantity) {
            return ComponentCost::line(CostLineItem::priced(
                Component::Delivery,
                name,
                spec.quantity,
                price,
                "",
            ));
        }

        warn!(
            event_name = "pricing.delivery.fallback",
            delivery_method = method,
            fallback_unit_price = %self.fallback_unit_price,
            "no delivery table matched; applying fallback rate"
        );
        ComponentCost::line(CostLineItem {
            component: Component::Delivery,
            name,
            quantity: spec.quantity,
            unit_price: self.fallback_unit_price,
            total_cost: self.fallback_unit_price * Decimal::from(spec.quantity),
            tier_used: None,
            details: format!(
                "delivery method `{method}` is not in the price tables; fallback rate {} applied",
                self.fallback_unit_price
            ),
            found: false,
        })
    }
}
