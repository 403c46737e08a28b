use serde::{Deserialize, Serialize};

use crate::domain::logo::LogoSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListOp {
    Add,
    Remove,
    ReplaceAll,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListEdit<T> {
    pub op: ListOp,
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> ListEdit<T> {
    pub fn add(items: Vec<T>) -> Self {
        Self { op: ListOp::Add, items }
    }

    pub fn remove(items: Vec<T>) -> Self {
        Self { op: ListOp::Remove, items }
    }

    pub fn replace_all(items: Vec<T>) -> Self {
        Self { op: ListOp::ReplaceAll, items }
    }
}

/// Sparse edit from one conversational turn. Only fields the user mentioned are set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialSpecificationDelta {
    pub quantity: Option<u32>,
    pub product_tier: Option<String>,
    pub fabric: Option<String>,
    pub closure: Option<String>,
    pub delivery_method: Option<String>,
    pub colors: Option<ListEdit<String>>,
    pub logos: Option<ListEdit<LogoSpec>>,
    pub accessories: Option<ListEdit<String>>,
}

impl PartialSpecificationDelta {
    pub fn quantity(quantity: u32) -> Self {
        Self { quantity: Some(quantity), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{ListOp, PartialSpecificationDelta};

    #[test]
    fn sparse_json_leaves_unmentioned_fields_empty() {
        let delta: PartialSpecificationDelta =
            serde_json::from_str(r#"{"quantity":150}"#).expect("parse delta");
        assert_eq!(delta, PartialSpecificationDelta::quantity(150));
        assert!(delta.logos.is_none());
        assert!(!delta.is_empty());
    }

    #[test]
    fn list_ops_use_upper_snake_case() {
        let delta: PartialSpecificationDelta = serde_json::from_str(
            r#"{"accessories":{"op":"REPLACE_ALL","items":["Hang Tag"]},"logos":{"op":"REMOVE","items":[{"position":"Back"}]}}"#,
        )
        .expect("parse delta");

        assert_eq!(delta.accessories.as_ref().map(|edit| edit.op), Some(ListOp::ReplaceAll));
        let logos = delta.logos.expect("logos edit");
        assert_eq!(logos.op, ListOp::Remove);
        assert_eq!(logos.items[0].position, "Back");
    }

    #[test]
    fn logo_edit_without_items_is_empty() {
        let delta: PartialSpecificationDelta =
            serde_json::from_str(r#"{"logos":{"op":"REPLACE_ALL"}}"#).expect("parse delta");

        let logos = delta.logos.expect("logos edit");
        assert_eq!(logos.op, ListOp::ReplaceAll);
        assert!(logos.items.is_empty());
    }
}
