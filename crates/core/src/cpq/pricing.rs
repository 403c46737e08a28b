use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::cost::{CostLineItem, QuoteResult};
use crate::domain::specification::QuoteSpecification;

/// Sums calculator output into a [`QuoteResult`].
///
/// Price tables already carry margin, so no markup is applied here. The output depends only on
/// its inputs: identical lines in identical order always produce an identical result.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuoteAggregator;

impl QuoteAggregator {
    pub fn aggregate(
        &self,
        spec: &QuoteSpecification,
        line_items: Vec<CostLineItem>,
        notes: Vec<String>,
    ) -> QuoteResult {
        let subtotal: Decimal = line_items.iter().map(|line| line.total_cost).sum();
        let per_unit_cost = per_unit(subtotal, spec.quantity);

        let mut warnings = notes;
        warnings.extend(
            line_items.iter().filter(|line| !line.found).map(|line| line.details.clone()),
        );

        QuoteResult { spec: spec.clone(), line_items, subtotal, per_unit_cost, warnings }
    }
}

/// Subtotal divided by quantity, rounded to cents. A zero quantity yields zero.
pub fn per_unit(subtotal: Decimal, quantity: u32) -> Decimal {
    if quantity == 0 {
        return Decimal::ZERO;
    }
    (subtotal / Decimal::from(quantity))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{per_unit, QuoteAggregator};
    use crate::cpq::tier::ResolvedPrice;
    use crate::domain::cost::{Component, CostLineItem};
    use crate::domain::specification::QuoteSpecification;

    fn line(component: Component, cents: i64, quantity: u32) -> CostLineItem {
        CostLineItem::priced(
            component,
            component.label(),
            quantity,
            ResolvedPrice { tier_used: 144, unit_price: Decimal::new(cents, 2) },
            "",
        )
    }

    #[test]
    fn subtotal_is_the_plain_sum_of_lines() {
        let spec = QuoteSpecification { quantity: 150, ..QuoteSpecification::default() };
        let result = QuoteAggregator.aggregate(
            &spec,
            vec![
                line(Component::BaseProduct, 425, 150),
                line(Component::LogoSetup, 100, 150),
                line(Component::Delivery, 271, 150),
            ],
            Vec::new(),
        );

        assert_eq!(result.subtotal, Decimal::new(119_400, 2));
        assert_eq!(result.per_unit_cost, Decimal::new(796, 2));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn not_found_lines_become_warnings_after_notes() {
        let spec = QuoteSpecification::default();
        let missing =
            CostLineItem::not_found(Component::Accessories, "Gold Pin", 48, "accessory missing");
        let result = QuoteAggregator.aggregate(
            &spec,
            vec![line(Component::BaseProduct, 500, 48), missing],
            vec!["Front logo: size defaulted".to_string()],
        );

        assert_eq!(result.warnings, vec!["Front logo: size defaulted", "accessory missing"]);
        assert_eq!(result.subtotal, Decimal::new(24_000, 2));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let spec = QuoteSpecification { quantity: 333, ..QuoteSpecification::default() };
        let lines = vec![line(Component::BaseProduct, 425, 333), line(Component::Closure, 0, 333)];
        let first = QuoteAggregator.aggregate(&spec, lines.clone(), Vec::new());
        let second = QuoteAggregator.aggregate(&spec, lines, Vec::new());
        assert_eq!(first, second);
    }

    #[test]
    fn per_unit_rounds_half_away_from_zero() {
        assert_eq!(per_unit(Decimal::new(1_000, 2), 3), Decimal::new(333, 2));
        assert_eq!(per_unit(Decimal::new(5, 2), 2), Decimal::new(3, 2));
        assert_eq!(per_unit(Decimal::ONE, 0), Decimal::ZERO);
    }
}
