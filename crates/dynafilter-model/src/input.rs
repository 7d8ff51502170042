//! DynamoDB JSON protocol request bodies for `Query` and `Scan`.
//!
//! Only the parameters the collector sets are modelled. Maps are ordered so
//! that two renderings of the same compiled query serialise identically.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::attribute_value::{AttributeValue, Key};

/// Request body for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The table to query.
    pub table_name: String,

    /// Condition on the partition (and optionally sort) key.
    pub key_condition_expression: String,

    /// Condition applied to items after the key lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// `#alias` to attribute name substitutions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,

    /// `:alias` to value substitutions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,

    /// Maximum number of items evaluated per call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// Request a strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Continuation cursor from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,
}

/// Request body for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The table to scan.
    pub table_name: String,

    /// Condition applied to every scanned item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// `#alias` to attribute name substitutions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_names: BTreeMap<String, String>,

    /// `:alias` to value substitutions.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,

    /// Maximum number of items evaluated per call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// Request a strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Continuation cursor from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Key>,
}
