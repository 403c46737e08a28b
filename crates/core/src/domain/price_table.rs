use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::tier::{self, ResolvedPrice};
use crate::errors::PricingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Product,
    Logo,
    Fabric,
    Closure,
    Accessory,
    Delivery,
}

impl ItemType {
    pub const ALL: [ItemType; 6] = [
        ItemType::Product,
        ItemType::Logo,
        ItemType::Fabric,
        ItemType::Closure,
        ItemType::Accessory,
        ItemType::Delivery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Product => "product",
            ItemType::Logo => "logo",
            ItemType::Fabric => "fabric",
            ItemType::Closure => "closure",
            ItemType::Accessory => "accessory",
            ItemType::Delivery => "delivery",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = PricingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "logo" => Ok(Self::Logo),
            "fabric" => Ok(Self::Fabric),
            "closure" => Ok(Self::Closure),
            "accessory" | "accessories" => Ok(Self::Accessory),
            "delivery" => Ok(Self::Delivery),
            other => Err(PricingError::validation(
                "item_type",
                format!(
                    "unsupported item type `{other}` (expected product|logo|fabric|closure|accessory|delivery)"
                ),
            )),
        }
    }
}

/// Minimum quantity that unlocks `unit_price`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_qty: u32,
    pub unit_price: Decimal,
}

impl Breakpoint {
    pub fn new(min_qty: u32, unit_price: Decimal) -> Self {
        Self { min_qty, unit_price }
    }
}

/// Identity of a price table: item type plus its normalized name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    pub item_type: ItemType,
    pub name: String,
}

impl TableId {
    pub fn new(item_type: ItemType, name: &str) -> Self {
        Self { item_type, name: normalize_name(name) }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_type, self.name)
    }
}

/// Lowercases and collapses whitespace so `"Laser  Cut"` and `"laser cut"` name the same table.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// A named, quantity-tiered price table.
///
/// Breakpoints are always sorted ascending by `min_qty` with no duplicates, so the first
/// breakpoint is the floor every quantity falls back to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceTable")]
pub struct PriceTable {
    name: String,
    item_type: ItemType,
    breakpoints: Vec<Breakpoint>,
}

#[derive(Deserialize)]
struct RawPriceTable {
    name: String,
    item_type: ItemType,
    breakpoints: Vec<Breakpoint>,
}

impl TryFrom<RawPriceTable> for PriceTable {
    type Error = PricingError;

    fn try_from(raw: RawPriceTable) -> Result<Self, Self::Error> {
        PriceTable::new(raw.name, raw.item_type, raw.breakpoints)
    }
}

impl PriceTable {
    pub fn new(
        name: impl Into<String>,
        item_type: ItemType,
        mut breakpoints: Vec<Breakpoint>,
    ) -> Result<Self, PricingError> {
        let name = name.into();
        let invalid = |reason: String| PricingError::InvalidTable { table: name.clone(), reason };

        if name.trim().is_empty() {
            return Err(invalid("table name must not be empty".to_string()));
        }
        if breakpoints.is_empty() {
            return Err(invalid("at least one breakpoint is required".to_string()));
        }

        breakpoints.sort_by_key(|breakpoint| breakpoint.min_qty);
        for pair in breakpoints.windows(2) {
            if pair[0].min_qty == pair[1].min_qty {
                return Err(invalid(format!("duplicate breakpoint at min_qty {}", pair[0].min_qty)));
            }
        }
        if let Some(negative) = breakpoints.iter().find(|b| b.unit_price.is_sign_negative()) {
            return Err(invalid(format!(
                "negative unit price {} at min_qty {}",
                negative.unit_price, negative.min_qty
            )));
        }

        Ok(Self { name: name.trim().to_string(), item_type, breakpoints })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn id(&self) -> TableId {
        TableId::new(self.item_type, &self.name)
    }

    pub fn resolve(&self, quantity: u32) -> ResolvedPrice {
        tier::resolve(&self.breakpoints, quantity)
            .unwrap_or(ResolvedPrice { tier_used: 0, unit_price: Decimal::ZERO })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{normalize_name, Breakpoint, ItemType, PriceTable, TableId};
    use crate::errors::PricingError;

    #[test]
    fn breakpoints_are_sorted_on_construction() {
        let table = PriceTable::new(
            "Tier 1",
            ItemType::Product,
            vec![
                Breakpoint::new(576, Decimal::new(390, 2)),
                Breakpoint::new(48, Decimal::new(500, 2)),
                Breakpoint::new(144, Decimal::new(425, 2)),
            ],
        )
        .expect("valid table");

        let mins = table.breakpoints().iter().map(|b| b.min_qty).collect::<Vec<_>>();
        assert_eq!(mins, vec![48, 144, 576]);
    }

    #[test]
    fn empty_and_duplicate_tables_are_rejected() {
        let empty = PriceTable::new("Sticker", ItemType::Accessory, Vec::new());
        assert!(matches!(empty, Err(PricingError::InvalidTable { .. })));

        let duplicate = PriceTable::new(
            "Sticker",
            ItemType::Accessory,
            vec![Breakpoint::new(48, Decimal::ONE), Breakpoint::new(48, Decimal::TWO)],
        );
        assert!(matches!(duplicate, Err(PricingError::InvalidTable { ref reason, .. }) if reason.contains("duplicate")));
    }

    #[test]
    fn negative_prices_are_rejected() {
        let result = PriceTable::new(
            "Sticker",
            ItemType::Accessory,
            vec![Breakpoint::new(48, Decimal::new(-10, 2))],
        );
        assert!(result.is_err());
    }

    #[test]
    fn table_ids_ignore_case_and_spacing() {
        assert_eq!(TableId::new(ItemType::Fabric, "Laser  Cut"), TableId::new(ItemType::Fabric, "laser cut"));
        assert_eq!(normalize_name("  Regular   Delivery "), "regular delivery");
        assert_eq!(TableId::new(ItemType::Delivery, "Regular Delivery").to_string(), "delivery:regular delivery");
    }

    #[test]
    fn item_type_parses_plural_accessories() {
        assert_eq!("Accessories".parse::<ItemType>(), Ok(ItemType::Accessory));
        assert!("hat".parse::<ItemType>().is_err());
    }

    #[test]
    fn deserialization_enforces_table_invariants() {
        let raw = r#"{"name":"Tier 1","item_type":"product","breakpoints":[]}"#;
        assert!(serde_json::from_str::<PriceTable>(raw).is_err());
    }
}
