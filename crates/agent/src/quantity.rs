use std::collections::BTreeSet;
use std::fmt;

use capquote_core::estimate::DescriptionReader;
use serde::{Deserialize, Serialize};

/// Which reading produced a quantity. Variants are listed in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityRule {
    ExplicitTotal,
    ColorSplit,
    DirectUnit,
    Keyword,
    Standalone,
}

impl QuantityRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitTotal => "explicit total",
            Self::ColorSplit => "colour split",
            Self::DirectUnit => "direct unit",
            Self::Keyword => "quantity keyword",
            Self::Standalone => "standalone number",
        }
    }
}

impl fmt::Display for QuantityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityReading {
    pub quantity: Option<u32>,
    pub rule: Option<QuantityRule>,
    pub note: Option<String>,
    pub ambiguous: bool,
}

impl QuantityReading {
    fn found(quantity: u32, rule: QuantityRule) -> Self {
        Self { quantity: Some(quantity), rule: Some(rule), note: None, ambiguous: false }
    }

    fn unclear(note: impl Into<String>, ambiguous: bool) -> Self {
        Self { quantity: None, rule: None, note: Some(note.into()), ambiguous }
    }
}

/// Deterministic order-quantity reader for free text.
///
/// Rules are tried in [`QuantityRule`] order and the first one that yields a value wins.
/// Sizes and money (`3D`, `$4.25`, `2.5"`) never count as quantities.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuantityExtractor;

impl QuantityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, text: &str) -> QuantityReading {
        let tokens = tokenize(text);
        let numbers = numbers(&tokens);

        if let Some(total) = explicit_total(&tokens) {
            return QuantityReading::found(total, QuantityRule::ExplicitTotal);
        }
        match color_split(&tokens, &numbers) {
            Some(ColorSplit::Sum(sum)) => {
                return QuantityReading::found(sum, QuantityRule::ColorSplit);
            }
            Some(ColorSplit::Overflow) => {
                return QuantityReading::unclear(
                    "could not tell which number is the quantity; how many caps do you need?",
                    true,
                );
            }
            None => {}
        }

        let direct = direct_unit(&tokens, &numbers);
        match direct.len() {
            0 => {}
            1 => {
                if let Some(quantity) = direct.first() {
                    return QuantityReading::found(*quantity, QuantityRule::DirectUnit);
                }
            }
            _ => {
                let listed = direct.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
                let note = format!(
                    "the message mentions several quantities ({listed}); which total do you need?"
                );
                return QuantityReading::unclear(note, true);
            }
        }

        if let Some(quantity) = keyword(&tokens) {
            return QuantityReading::found(quantity, QuantityRule::Keyword);
        }
        if let [(_, quantity)] = numbers.as_slice() {
            if *quantity >= 1 {
                return QuantityReading::found(*quantity, QuantityRule::Standalone);
            }
        }

        if numbers.is_empty() {
            QuantityReading::unclear(
                "no quantity found in the message; how many caps do you need?",
                false,
            )
        } else {
            QuantityReading::unclear(
                "could not tell which number is the quantity; how many caps do you need?",
                true,
            )
        }
    }
}

impl DescriptionReader for QuantityExtractor {
    fn quantity(&self, description: &str) -> Option<u32> {
        self.read(description).quantity
    }
}

const UNIT_WORDS: &[&str] =
    &["pieces", "piece", "pcs", "pc", "caps", "cap", "hats", "hat", "units", "unit"];

const SIZE_WORDS: &[&str] = &["inch", "inches", "cm", "mm"];

const COLOR_WORDS: &[&str] = &[
    "black", "white", "navy", "red", "blue", "royal", "green", "olive", "grey", "gray",
    "charcoal", "khaki", "tan", "brown", "orange", "yellow", "gold", "pink", "purple", "maroon",
    "burgundy", "teal", "silver", "camo", "heather",
];

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_ascii_lowercase();
    let chars = lowered.chars().collect::<Vec<_>>();
    let mut sanitized = String::with_capacity(lowered.len());

    for (index, character) in chars.iter().enumerate() {
        let between_digits = || {
            index > 0
                && chars[index - 1].is_ascii_digit()
                && chars.get(index + 1).is_some_and(char::is_ascii_digit)
        };
        match character {
            ',' if between_digits() => {}
            c if c.is_ascii_alphanumeric() || matches!(c, '$' | '.' | '"') => sanitized.push(*c),
            _ => sanitized.push(' '),
        }
    }

    sanitized
        .split_whitespace()
        .map(|token| token.trim_end_matches('.'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plain counting numbers with their token index. Money, decimals, and sizes are skipped.
fn numbers(tokens: &[String]) -> Vec<(usize, u32)> {
    tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| !tokens.get(index + 1).is_some_and(|next| is_size_word(next)))
        .filter_map(|(index, token)| plain_number(token).map(|value| (index, value)))
        .collect()
}

fn plain_number(token: &str) -> Option<u32> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn is_size_word(token: &str) -> bool {
    SIZE_WORDS.contains(&token)
}

fn is_unit(token: Option<&String>) -> bool {
    token.is_some_and(|token| UNIT_WORDS.contains(&token.as_str()))
}

fn is_color(token: Option<&String>) -> bool {
    token.is_some_and(|token| COLOR_WORDS.contains(&token.as_str()))
}

fn explicit_total(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        let Some(value) = plain_number(token).filter(|value| *value > 0) else {
            continue;
        };
        let next = tokens.get(index + 1).map(String::as_str);
        let after = tokens.get(index + 2).map(String::as_str);
        let before = index.checked_sub(1).and_then(|i| tokens.get(i)).map(String::as_str);
        let two_before = index.checked_sub(2).and_then(|i| tokens.get(i)).map(String::as_str);

        let trailing = next == Some("total") || (next == Some("in") && after == Some("total"));
        let leading =
            before == Some("total") || (before == Some("of") && two_before == Some("total"));
        if trailing || leading {
            return Some(value);
        }
    }
    None
}

enum ColorSplit {
    Sum(u32),
    Overflow,
}

fn color_split(tokens: &[String], numbers: &[(usize, u32)]) -> Option<ColorSplit> {
    let parts = numbers
        .iter()
        .filter(|(index, _)| {
            let next = tokens.get(index + 1);
            is_color(next) || (is_unit(next) && is_color(tokens.get(index + 2)))
        })
        .map(|(_, value)| *value)
        .collect::<Vec<_>>();

    if parts.len() < 2 {
        return None;
    }
    match parts.iter().try_fold(0u32, |total, part| total.checked_add(*part)) {
        Some(0) => None,
        Some(sum) => Some(ColorSplit::Sum(sum)),
        None => Some(ColorSplit::Overflow),
    }
}

fn direct_unit(tokens: &[String], numbers: &[(usize, u32)]) -> Vec<u32> {
    numbers
        .iter()
        .filter(|(index, value)| *value > 0 && is_unit(tokens.get(index + 1)))
        .map(|(_, value)| *value)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn keyword(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        if matches!(token.as_str(), "qty" | "quantity") {
            if let Some(value) = tokens.get(index + 1).and_then(|next| plain_number(next)) {
                return Some(value).filter(|value| *value > 0);
            }
        }
        for prefix in ["x", "qty"] {
            if let Some(value) = token.strip_prefix(prefix).and_then(plain_number) {
                if value > 0 {
                    return Some(value);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{QuantityExtractor, QuantityRule};

    fn read(text: &str) -> (Option<u32>, Option<QuantityRule>) {
        let reading = QuantityExtractor.read(text);
        (reading.quantity, reading.rule)
    }

    #[test]
    fn explicit_total_beats_everything_else() {
        assert_eq!(read("300 black and 300 navy, 600 total"), (Some(600), Some(QuantityRule::ExplicitTotal)));
        assert_eq!(read("a total of 1,200 caps"), (Some(1200), Some(QuantityRule::ExplicitTotal)));
        assert_eq!(read("we want 250 in total"), (Some(250), Some(QuantityRule::ExplicitTotal)));
    }

    #[test]
    fn colour_split_numbers_are_summed() {
        assert_eq!(read("300 black and 300 navy"), (Some(600), Some(QuantityRule::ColorSplit)));
        assert_eq!(
            read("100 caps white, 50 caps red"),
            (Some(150), Some(QuantityRule::ColorSplit))
        );
    }

    #[test]
    fn colour_split_that_overflows_asks_for_the_quantity() {
        let reading = QuantityExtractor.read("4000000000 black and 4000000000 navy");
        assert_eq!(reading.quantity, None);
        assert!(reading.ambiguous);
        assert!(reading.note.as_deref().is_some_and(|note| note.contains("how many caps")));
    }

    #[test]
    fn single_direct_unit_number() {
        assert_eq!(read("make it 150 pieces"), (Some(150), Some(QuantityRule::DirectUnit)));
        assert_eq!(read("150 pcs with a 3D logo at $4.25"), (Some(150), Some(QuantityRule::DirectUnit)));
    }

    #[test]
    fn several_direct_unit_numbers_are_ambiguous() {
        let reading = QuantityExtractor.read("either 144 caps or 288 caps");
        assert_eq!(reading.quantity, None);
        assert!(reading.ambiguous);
    }

    #[test]
    fn keyword_forms() {
        assert_eq!(read("qty 150 please"), (Some(150), Some(QuantityRule::Keyword)));
        assert_eq!(read("Quantity: 96, fitted"), (Some(96), Some(QuantityRule::Keyword)));
        assert_eq!(read("snapback x150 and 2 logos"), (Some(150), Some(QuantityRule::Keyword)));
    }

    #[test]
    fn standalone_number_only_when_it_is_the_only_one() {
        assert_eq!(read("can we do 500?"), (Some(500), Some(QuantityRule::Standalone)));
        assert_eq!(read("500 or maybe 700"), (None, None));
    }

    #[test]
    fn sizes_and_money_never_count() {
        assert_eq!(read("3D embroidery, 2.5\" wide, $4.25 each"), (None, None));
        assert_eq!(read("logo about 3 inches wide"), (None, None));
    }

    #[test]
    fn missing_quantity_comes_with_a_note() {
        let reading = QuantityExtractor.read("add a leather patch on the back");
        assert_eq!(reading.quantity, None);
        assert!(reading.note.is_some());
        assert!(!reading.ambiguous);
    }
}
