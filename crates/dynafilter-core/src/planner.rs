//! Query planner: routes each condition to the key bucket or the filter bucket.

use dynafilter_model::BackendOperation;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::{Condition, Connector};
use crate::error::ValidationError;

/// Attribute names that form a table's primary key, partition key first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySchema(Vec<String>);

impl KeySchema {
    /// Create a schema from key attribute names.
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(attributes.into_iter().map(Into::into).collect())
    }

    /// Whether `field` is one of the key attributes.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|a| a == field)
    }

    /// Key attribute names in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.0
    }
}

/// Conditions split by how the backend can serve them.
///
/// Both buckets keep the relative order and connectors the conditions had in
/// the filter string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    /// Conditions served by an indexed key lookup.
    pub key_conditions: Vec<Condition>,
    /// Conditions evaluated against retrieved items.
    pub filter_conditions: Vec<Condition>,
}

impl QueryPlan {
    /// `Query` when any key condition exists, otherwise `Scan`.
    #[must_use]
    pub fn operation(&self) -> BackendOperation {
        if self.key_conditions.is_empty() {
            BackendOperation::Scan
        } else {
            BackendOperation::Query
        }
    }

    /// Whether the plan carries no predicate at all.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.key_conditions.is_empty() && self.filter_conditions.is_empty()
    }
}

/// Whether `field` may be served by a key condition.
///
/// Without a schema every field is key-eligible.
#[must_use]
pub fn is_key_eligible(schema: Option<&KeySchema>, field: &str) -> bool {
    schema.is_none_or(|s| s.contains(field))
}

/// Split `conditions` into key and filter buckets.
///
/// The key bucket is always ANDed with the filter bucket, so an `or` is
/// rejected wherever it would put a key condition inside a disjunction: on the
/// key condition itself, or anywhere after the first key condition in the
/// left-to-right fold.
///
/// # Errors
///
/// Returns [`ValidationError::DisjunctiveKeyCondition`] naming the key
/// attribute caught in the disjunction.
pub fn plan(
    conditions: &[Condition],
    schema: Option<&KeySchema>,
) -> Result<QueryPlan, ValidationError> {
    let mut plan = QueryPlan::default();
    let mut first_key: Option<&str> = None;

    for condition in conditions {
        let key_eligible = is_key_eligible(schema, &condition.field);
        if key_eligible && first_key.is_none() {
            first_key = Some(&condition.field);
        }

        if condition.connector == Connector::Or {
            let offending = if key_eligible {
                Some(condition.field.as_str())
            } else {
                first_key
            };
            if let Some(field) = offending {
                return Err(ValidationError::DisjunctiveKeyCondition {
                    field: field.to_owned(),
                });
            }
        }

        if key_eligible {
            plan.key_conditions.push(condition.clone());
        } else {
            plan.filter_conditions.push(condition.clone());
        }
    }

    debug!(
        key_conditions = plan.key_conditions.len(),
        filter_conditions = plan.filter_conditions.len(),
        operation = %plan.operation(),
        "planned filter"
    );
    Ok(plan)
}

/// Route every condition to the filter bucket, forcing a scan whatever the
/// table's keys are. Disjunctions are unrestricted.
#[must_use]
pub fn plan_scan(conditions: &[Condition]) -> QueryPlan {
    debug!(
        filter_conditions = conditions.len(),
        "planned forced scan"
    );
    QueryPlan {
        key_conditions: Vec::new(),
        filter_conditions: conditions.to_vec(),
    }
}
