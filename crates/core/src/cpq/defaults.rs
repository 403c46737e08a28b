//! Built-in price tables used when no external table source is configured.
//!
//! Every table shares one break schedule. Logo tables are derived from a per-decoration Medium
//! base row scaled by size and shifted by an application surcharge.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::logo::{
    logo_table_name, mold_table_name, ApplicationMethod, DecorationMethod, LogoSize,
};
use crate::domain::price_table::{normalize_name, Breakpoint, ItemType, PriceTable};
use crate::errors::PricingError;

pub const BREAK_SCHEDULE: [u32; 6] = [48, 144, 576, 1_152, 2_880, 10_000];

/// Fabrics that never add cost. Checked before any fabric table.
pub const FREE_FABRICS: [&str; 4] = ["Polyester", "Mesh", "Chino Twill", "Cotton Twill"];

type Row = [i64; 6];

const PRODUCT_TIERS: [(&str, Row); 3] = [
    ("Tier 1", [500, 425, 390, 360, 340, 320]),
    ("Tier 2", [540, 460, 420, 390, 370, 350]),
    ("Tier 3", [590, 505, 460, 425, 400, 380]),
];

const LOGO_MEDIUM_BASE: [(DecorationMethod, Row); 8] = [
    (DecorationMethod::ThreeDEmbroidery, [160, 140, 120, 105, 95, 85]),
    (DecorationMethod::FlatEmbroidery, [120, 100, 85, 75, 68, 60]),
    (DecorationMethod::LaserCut, [100, 80, 70, 62, 56, 50]),
    (DecorationMethod::RubberPatch, [180, 150, 125, 110, 98, 88]),
    (DecorationMethod::LeatherPatch, [170, 140, 120, 105, 95, 85]),
    (DecorationMethod::WovenPatch, [140, 115, 98, 86, 78, 70]),
    (DecorationMethod::PrintedPatch, [130, 105, 90, 80, 72, 65]),
    (DecorationMethod::ScreenPrint, [90, 70, 55, 48, 42, 38]),
];

const MOLD_CHARGES: [(LogoSize, i64); 4] = [
    (LogoSize::Small, 4_000),
    (LogoSize::Medium, 5_000),
    (LogoSize::Large, 6_000),
    (LogoSize::ExtraLarge, 7_500),
];

const FABRICS: [(&str, Row); 4] = [
    ("Laser Cut", [90, 75, 65, 58, 52, 48]),
    ("Suede", [160, 140, 125, 110, 100, 90]),
    ("Corduroy", [120, 100, 90, 80, 72, 65]),
    ("Camo", [80, 65, 55, 50, 45, 40]),
];

const CLOSURES: [(&str, Row); 6] = [
    ("Snapback", [0, 0, 0, 0, 0, 0]),
    ("Strapback", [60, 50, 42, 38, 35, 32]),
    ("Fitted", [90, 75, 65, 58, 52, 48]),
    ("Flexfit", [110, 95, 82, 75, 70, 65]),
    ("Buckle", [75, 62, 54, 48, 44, 40]),
    ("Velcro", [40, 32, 28, 25, 22, 20]),
];

const ACCESSORIES: [(&str, Row); 5] = [
    ("Hang Tag", [50, 40, 32, 28, 25, 22]),
    ("Sticker", [30, 24, 20, 17, 15, 13]),
    ("Inside Label", [45, 36, 30, 26, 23, 20]),
    ("Printed Tape", [40, 32, 27, 24, 21, 19]),
    ("Bag and Bowl", [85, 70, 60, 54, 50, 46]),
];

const DELIVERY: [(&str, Row); 4] = [
    ("Regular Delivery", [325, 271, 230, 205, 190, 175]),
    ("Priority Delivery", [440, 370, 320, 290, 270, 250]),
    ("Air Freight", [290, 240, 195, 170, 155, 140]),
    ("Sea Freight", [150, 120, 95, 80, 70, 60]),
];

fn size_multiplier(size: LogoSize) -> Decimal {
    match size {
        LogoSize::Small => Decimal::new(8, 1),
        LogoSize::Medium => Decimal::ONE,
        LogoSize::Large => Decimal::new(125, 2),
        LogoSize::ExtraLarge => Decimal::new(15, 1),
    }
}

fn application_surcharge(application: ApplicationMethod) -> Decimal {
    match application {
        ApplicationMethod::Direct => Decimal::ZERO,
        ApplicationMethod::Run => Decimal::new(10, 2),
        ApplicationMethod::Velcro => Decimal::new(35, 2),
        ApplicationMethod::Satin => Decimal::new(20, 2),
    }
}

fn scheduled(
    name: impl Into<String>,
    item_type: ItemType,
    prices: impl IntoIterator<Item = Decimal>,
) -> Result<PriceTable, PricingError> {
    let breakpoints =
        BREAK_SCHEDULE.iter().zip(prices).map(|(min_qty, price)| Breakpoint::new(*min_qty, price));
    PriceTable::new(name, item_type, breakpoints.collect())
}

fn cents(row: &Row) -> impl Iterator<Item = Decimal> + '_ {
    row.iter().map(|value| Decimal::new(*value, 2))
}

/// Every built-in table.
pub fn default_tables() -> Result<Vec<PriceTable>, PricingError> {
    let mut tables = Vec::new();

    for (name, row) in &PRODUCT_TIERS {
        tables.push(scheduled(*name, ItemType::Product, cents(row))?);
    }

    for (decoration, base) in &LOGO_MEDIUM_BASE {
        for size in LogoSize::ALL {
            for application in ApplicationMethod::ALL {
                let prices = cents(base).map(|price| {
                    (price * size_multiplier(size) + application_surcharge(application))
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                });
                let name = logo_table_name(*decoration, size, application);
                tables.push(scheduled(name, ItemType::Logo, prices)?);
            }
        }
    }

    for (size, charge) in MOLD_CHARGES {
        tables.push(PriceTable::new(
            mold_table_name(size),
            ItemType::Logo,
            vec![Breakpoint::new(BREAK_SCHEDULE[0], Decimal::new(charge, 2))],
        )?);
    }

    for (name, row) in &FABRICS {
        tables.push(scheduled(*name, ItemType::Fabric, cents(row))?);
    }
    for (name, row) in &CLOSURES {
        tables.push(scheduled(*name, ItemType::Closure, cents(row))?);
    }
    for (name, row) in &ACCESSORIES {
        tables.push(scheduled(*name, ItemType::Accessory, cents(row))?);
    }
    for (name, row) in &DELIVERY {
        tables.push(scheduled(*name, ItemType::Delivery, cents(row))?);
    }

    Ok(tables)
}

pub fn is_free_fabric(name: &str) -> bool {
    let name = normalize_name(name);
    FREE_FABRICS.iter().any(|free| normalize_name(free) == name)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{default_tables, is_free_fabric, BREAK_SCHEDULE};
    use crate::cpq::catalog::{PriceCatalog, PriceLookup};
    use crate::domain::price_table::ItemType;

    fn catalog() -> PriceCatalog {
        PriceCatalog::new(default_tables().expect("defaults are valid"), 1, "builtin")
    }

    #[test]
    fn defaults_cover_every_logo_combination() {
        let catalog = catalog();
        assert_eq!(catalog.names(ItemType::Logo).len(), 8 * 4 * 4 + 4);
        assert_eq!(catalog.schedule(), &BREAK_SCHEDULE);
    }

    #[test]
    fn reference_prices_at_the_144_tier() {
        let catalog = catalog();
        let at = |item_type, name| {
            catalog.unit_price(item_type, name, 150).map(|price| price.unit_price)
        };
        assert_eq!(at(ItemType::Product, "Tier 1"), Some(Decimal::new(425, 2)));
        assert_eq!(at(ItemType::Logo, "Laser Cut | Large | Direct"), Some(Decimal::new(100, 2)));
        assert_eq!(at(ItemType::Delivery, "Regular Delivery"), Some(Decimal::new(271, 2)));
    }

    #[test]
    fn application_surcharges_stack_on_size() {
        let catalog = catalog();
        let price = catalog
            .unit_price(ItemType::Logo, "3D Embroidery | Extra Large | Velcro", 48)
            .expect("table exists");
        assert_eq!(price.unit_price, Decimal::new(275, 2));
    }

    #[test]
    fn every_default_table_descends_with_quantity() {
        for table in default_tables().expect("defaults") {
            for pair in table.breakpoints().windows(2) {
                assert!(pair[1].unit_price <= pair[0].unit_price, "{} rises", table.name());
            }
        }
    }

    #[test]
    fn free_fabric_check_ignores_case() {
        assert!(is_free_fabric("polyester"));
        assert!(is_free_fabric("Chino  Twill"));
        assert!(!is_free_fabric("Suede"));
    }
}
