use std::collections::BTreeSet;

use super::{ComponentCalculator, ComponentCost};
use crate::cpq::catalog::PriceLookup;
use crate::cpq::logo_parser::LogoSpecParser;
use crate::domain::cost::{Component, CostLineItem};
use crate::domain::logo::{mold_table_name, DecorationMethod, LogoSize};
use crate::domain::price_table::ItemType;
use crate::domain::specification::QuoteSpecification;

/// Molds are tooling and always price at the floor of their table.
const MOLD_QUANTITY: u32 = 1;

/// Per-unit decoration cost for every logo, plus a one-time mold charge per distinct molded
/// pattern on the order.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogoSetupCalculator {
    parser: LogoSpecParser,
}

impl ComponentCalculator for LogoSetupCalculator {
    fn component(&self) -> Component {
        Component::LogoSetup
    }

    fn calculate(&self, spec: &QuoteSpecification, prices: &dyn PriceLookup) -> ComponentCost {
        let mut cost = ComponentCost::default();
        let mut molds = BTreeSet::<(DecorationMethod, LogoSize)>::new();

        for logo_spec in &spec.logos {
            let parsed = self.parser.resolve(&logo_spec.descriptor);
            let position = logo_spec.position.trim();
            cost.notes
                .extend(parsed.notes.into_iter().map(|note| format!("{position} logo: {note}")));

            let logo = parsed.logo;
            let name = format!("Logo ({position}): {logo}");
            let table = logo.table_name();
            let line = match prices.unit_price(ItemType::Logo, &table, spec.quantity) {
                Some(price) => CostLineItem::priced(
                    Component::LogoSetup,
                    name,
                    spec.quantity,
                    price,
                    format!("{table} at the {}+ break", price.tier_used),
                ),
                None => CostLineItem::not_found(
                    Component::LogoSetup,
                    name,
                    spec.quantity,
                    format!("logo table `{table}` is not in the price tables; priced at 0"),
                ),
            };
            cost.lines.push(line);

            if logo.decoration_method.requires_mold() {
                molds.insert((logo.decoration_method, logo.size));
            }
        }

        for (decoration, size) in molds {
            let table = mold_table_name(size);
            let name = format!("Mold Charge ({}, {})", decoration.label(), size.label());
            let line = match prices.unit_price(ItemType::Logo, &table, MOLD_QUANTITY) {
                Some(price) => {
                    CostLineItem::priced(Component::LogoSetup, name, 1, price, "one-time tooling")
                }
                None => CostLineItem::not_found(
                    Component::LogoSetup,
                    name,
                    1,
                    format!("mold table `{table}` is not in the price tables; priced at 0"),
                ),
            };
            cost.lines.push(line);
        }

        cost
    }
}
