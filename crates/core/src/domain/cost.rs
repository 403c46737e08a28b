use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::tier::ResolvedPrice;
use crate::domain::specification::QuoteSpecification;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    BaseProduct,
    LogoSetup,
    PremiumFabric,
    Closure,
    Accessories,
    Delivery,
}

impl Component {
    pub fn label(&self) -> &'static str {
        match self {
            Component::BaseProduct => "base product",
            Component::LogoSetup => "logo setup",
            Component::PremiumFabric => "premium fabric",
            Component::Closure => "closure",
            Component::Accessories => "accessories",
            Component::Delivery => "delivery",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLineItem {
    pub component: Component,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub tier_used: Option<u32>,
    pub details: String,
    pub found: bool,
}

impl CostLineItem {
    pub fn priced(
        component: Component,
        name: impl Into<String>,
        quantity: u32,
        price: ResolvedPrice,
        details: impl Into<String>,
    ) -> Self {
        Self {
            component,
            name: name.into(),
            quantity,
            unit_price: price.unit_price,
            total_cost: price.unit_price * Decimal::from(quantity),
            tier_used: Some(price.tier_used),
            details: details.into(),
            found: true,
        }
    }

    /// Zero-cost placeholder for an item the price tables do not know.
    pub fn not_found(
        component: Component,
        name: impl Into<String>,
        quantity: u32,
        details: impl Into<String>,
    ) -> Self {
        Self {
            component,
            name: name.into(),
            quantity,
            unit_price: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            tier_used: None,
            details: details.into(),
            found: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub spec: QuoteSpecification,
    pub line_items: Vec<CostLineItem>,
    pub subtotal: Decimal,
    pub per_unit_cost: Decimal,
    pub warnings: Vec<String>,
}

impl QuoteResult {
    pub fn lines_for(&self, component: Component) -> impl Iterator<Item = &CostLineItem> {
        self.line_items.iter().filter(move |line| line.component == component)
    }

    pub fn component_total(&self, component: Component) -> Decimal {
        self.lines_for(component).map(|line| line.total_cost).sum()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Component, CostLineItem};
    use crate::cpq::tier::ResolvedPrice;

    #[test]
    fn priced_line_multiplies_unit_price_by_quantity() {
        let line = CostLineItem::priced(
            Component::BaseProduct,
            "Base Cap (Tier 1)",
            150,
            ResolvedPrice { tier_used: 144, unit_price: Decimal::new(425, 2) },
            "",
        );
        assert_eq!(line.total_cost, Decimal::new(63_750, 2));
        assert_eq!(line.tier_used, Some(144));
        assert!(line.found);
    }

    #[test]
    fn not_found_line_is_zero_cost() {
        let line = CostLineItem::not_found(Component::Accessories, "Gold Pin", 150, "unknown");
        assert_eq!(line.total_cost, Decimal::ZERO);
        assert!(!line.found);
        assert_eq!(line.tier_used, None);
    }
}
