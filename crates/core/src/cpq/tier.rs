//! Quantity to price-break resolution.
//!
//! A quantity belongs to the highest breakpoint whose `min_qty` is at or below it. Quantities
//! under every breakpoint use the lowest one, so every quantity resolves to some tier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::price_table::Breakpoint;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub tier_used: u32,
    pub unit_price: Decimal,
}

/// `breakpoints` must be sorted ascending by `min_qty`. Returns `None` only for an empty slice.
pub fn resolve_breakpoint(breakpoints: &[Breakpoint], quantity: u32) -> Option<&Breakpoint> {
    let floor = breakpoints.first()?;
    let above = breakpoints.partition_point(|breakpoint| breakpoint.min_qty <= quantity);
    Some(if above == 0 { floor } else { &breakpoints[above - 1] })
}

pub fn resolve(breakpoints: &[Breakpoint], quantity: u32) -> Option<ResolvedPrice> {
    resolve_breakpoint(breakpoints, quantity).map(|breakpoint| ResolvedPrice {
        tier_used: breakpoint.min_qty,
        unit_price: breakpoint.unit_price,
    })
}

/// Bracket of a sorted break schedule that `quantity` falls into, with the same floor rule.
pub fn bracket(schedule: &[u32], quantity: u32) -> u32 {
    let above = schedule.partition_point(|min_qty| *min_qty <= quantity);
    match above {
        0 => schedule.first().copied().unwrap_or(0),
        index => schedule[index - 1],
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{bracket, resolve};
    use crate::domain::price_table::Breakpoint;

    fn descending_table() -> Vec<Breakpoint> {
        [(48, 500), (144, 425), (576, 390), (1152, 360), (2880, 340), (10_000, 320)]
            .into_iter()
            .map(|(min_qty, cents)| Breakpoint::new(min_qty, Decimal::new(cents, 2)))
            .collect()
    }

    #[test]
    fn exact_breakpoint_belongs_to_that_breakpoint() {
        let table = descending_table();
        let at_576 = resolve(&table, 576).expect("resolves");
        assert_eq!(at_576.tier_used, 576);
        assert_eq!(at_576.unit_price, Decimal::new(390, 2));

        let below_576 = resolve(&table, 575).expect("resolves");
        assert_eq!(below_576.tier_used, 144);
    }

    #[test]
    fn quantity_below_every_breakpoint_uses_the_floor() {
        let table = descending_table();
        let tiny = resolve(&table, 1).expect("resolves");
        assert_eq!(tiny.tier_used, 48);
        assert_eq!(tiny.unit_price, Decimal::new(500, 2));
    }

    #[test]
    fn quantity_above_every_breakpoint_uses_the_top_tier() {
        let table = descending_table();
        assert_eq!(resolve(&table, 250_000).map(|price| price.tier_used), Some(10_000));
    }

    #[test]
    fn one_fifty_falls_in_the_144_bracket() {
        let table = descending_table();
        assert_eq!(resolve(&table, 150).map(|price| price.tier_used), Some(144));
    }

    #[test]
    fn unit_price_is_monotonic_for_descending_tables() {
        let table = descending_table();
        let mut previous = resolve(&table, 1).expect("resolves").unit_price;
        for quantity in 2..=12_000 {
            let current = resolve(&table, quantity).expect("resolves").unit_price;
            assert!(current <= previous, "price rose at quantity {quantity}");
            previous = current;
        }
    }

    #[test]
    fn empty_table_has_no_tier() {
        assert_eq!(resolve(&[], 100), None);
    }

    #[test]
    fn schedule_bracket_follows_the_same_rules() {
        let schedule = [48, 144, 576];
        assert_eq!(bracket(&schedule, 10), 48);
        assert_eq!(bracket(&schedule, 144), 144);
        assert_eq!(bracket(&schedule, 575), 144);
        assert_eq!(bracket(&schedule, 9_999), 576);
        assert_eq!(bracket(&[], 9_999), 0);
    }
}
