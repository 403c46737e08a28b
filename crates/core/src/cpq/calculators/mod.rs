//! One calculator per cost component. Each is a pure function of the specification and a
//! price lookup; an unknown item yields a zero-cost line marked `found = false`.

mod accessories;
mod base_product;
mod closure;
mod delivery;
mod fabric;
mod logo;

use rust_decimal::Decimal;

pub use accessories::AccessoriesCalculator;
pub use base_product::BaseProductCalculator;
pub use closure::ClosureCalculator;
pub use delivery::DeliveryCalculator;
pub use fabric::PremiumFabricCalculator;
pub use logo::LogoSetupCalculator;

use crate::cpq::catalog::PriceLookup;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::specification::QuoteSpecification;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentCost {
    pub lines: Vec<CostLineItem>,
    pub notes: Vec<String>,
}

impl ComponentCost {
    pub fn line(line: CostLineItem) -> Self {
        Self { lines: vec![line], notes: Vec::new() }
    }
}

pub trait ComponentCalculator: Send + Sync {
    fn component(&self) -> Component;

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost;
}

/// The six calculators in line-item order.
pub fn standard_calculators(delivery_fallback: Decimal) -> Vec<Box<dyn ComponentCalculator>> {
    vec![
        Box::new(BaseProductCalculator),
        Box::new(LogoSetupCalculator::default()),
        Box::new(PremiumFabricCalculator),
        Box::new(ClosureCalculator),
        Box::new(AccessoriesCalculator),
        Box::new(DeliveryCalculator::new(delivery_fallback)),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::cpq::catalog::PriceCatalog;
    use crate::cpq::defaults::default_tables;

    pub fn builtin_catalog() -> PriceCatalog {
        PriceCatalog::new(default_tables().expect("built-in tables are valid"), 1, "builtin")
    }
}
