use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::logo::LogoSpec;

pub const DEFAULT_QUANTITY: u32 = 48;
pub const DEFAULT_PRODUCT_TIER: &str = "Tier 1";
pub const DEFAULT_CLOSURE: &str = "Snapback";
pub const DEFAULT_DELIVERY_METHOD: &str = "Regular Delivery";

/// One fabric, or two independently priced fabrics written as `"A/B"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FabricSelection {
    primary: String,
    secondary: Option<String>,
}

impl FabricSelection {
    /// Returns `None` when the string names no fabric at all. Parts past the second are
    /// dropped; use [`FabricSelection::parse_with_extra`] to see them.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::parse_with_extra(raw).0
    }

    /// Parses like [`FabricSelection::parse`] and also returns every part past the second.
    pub fn parse_with_extra(raw: &str) -> (Option<Self>, Vec<String>) {
        let mut parts =
            raw.split('/').map(str::trim).filter(|part| !part.is_empty()).map(str::to_string);
        let Some(primary) = parts.next() else {
            return (None, Vec::new());
        };
        let secondary = parts.next();
        (Some(Self { primary, secondary }), parts.collect())
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_deref()
    }

    pub fn is_split(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn parts(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str()).chain(self.secondary.as_deref()).collect()
    }
}

impl fmt::Display for FabricSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "{}/{}", self.primary, secondary),
            None => f.write_str(&self.primary),
        }
    }
}

impl TryFrom<String> for FabricSelection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Self::parse_with_extra(&value) {
            (Some(fabric), extra) if extra.is_empty() => Ok(fabric),
            (Some(_), _) => Err(format!("`{value}` names more than two fabrics")),
            (None, _) => Err(format!("`{value}` does not name a fabric")),
        }
    }
}

impl From<FabricSelection> for String {
    fn from(value: FabricSelection) -> Self {
        value.to_string()
    }
}

/// Complete, immutable description of what is being quoted.
///
/// Every conversational turn produces a new instance; nothing in the engine mutates one
/// after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSpecification {
    pub quantity: u32,
    pub product_tier: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub fabric: Option<FabricSelection>,
    #[serde(default)]
    pub logos: Vec<LogoSpec>,
    pub closure: String,
    #[serde(default)]
    pub accessories: Vec<String>,
    pub delivery_method: String,
}

impl Default for QuoteSpecification {
    fn default() -> Self {
        Self {
            quantity: DEFAULT_QUANTITY,
            product_tier: DEFAULT_PRODUCT_TIER.to_string(),
            colors: Vec::new(),
            fabric: None,
            logos: Vec::new(),
            closure: DEFAULT_CLOSURE.to_string(),
            accessories: Vec::new(),
            delivery_method: DEFAULT_DELIVERY_METHOD.to_string(),
        }
    }
}

impl QuoteSpecification {
    /// SHA-256 over the canonical JSON form; equal specifications hash equally.
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}
