//! One page of backend results.

use serde::{Deserialize, Serialize};

use crate::attribute_value::{Item, Key};

/// A single `Query` or `Scan` response page.
///
/// Both operations share this shape. A response without an `Items` field
/// decodes as an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageOutput {
    /// Items in this page, in backend order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,

    /// Number of items in this page after the filter expression.
    #[serde(default)]
    pub count: i32,

    /// Number of items evaluated before the filter expression.
    #[serde(default)]
    pub scanned_count: i32,

    /// Continuation cursor. Absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Key>,
}

impl PageOutput {
    /// Build a page holding `items` and an optional cursor.
    #[must_use]
    pub fn new(items: Vec<Item>, last_evaluated_key: Option<Key>) -> Self {
        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        Self {
            items: Some(items),
            count,
            scanned_count: count,
            last_evaluated_key,
        }
    }

    /// Consume the page, returning its items (empty when absent) and cursor.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Item>, Option<Key>) {
        (self.items.unwrap_or_default(), self.last_evaluated_key)
    }
}
