//! Exact in-memory pass for filters the backend could only approximate.
//!
//! `endswith` is sent to the backend as `contains`, which returns a superset.
//! After pagination completes the exact form of the filter tree, with a true
//! suffix test in place of each approximated leaf, is evaluated against every
//! item. Connectors are honoured, so an item kept only by the other side of an
//! `or` survives.

use std::collections::BTreeMap;

use dynafilter_model::{AttributeValue, Item};
use tracing::debug;

use crate::expression::{CompiledQuery, EvalContext, EvalError, Expr};

/// The in-memory pass for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    expression: Option<Expr>,
    names: BTreeMap<String, String>,
    values: BTreeMap<String, AttributeValue>,
}

impl PostFilter {
    /// Build the pass from a compiled query's exact filter, if it has one.
    #[must_use]
    pub fn from_compiled(compiled: &CompiledQuery) -> Self {
        match &compiled.exact_filter {
            Some(expression) => Self {
                expression: Some(expression.clone()),
                names: compiled.attribute_names.clone(),
                values: compiled.attribute_values.clone(),
            },
            None => Self::default(),
        }
    }

    /// Whether the pass has nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expression.is_none()
    }

    /// Keep only the items the exact filter accepts, preserving order.
    ///
    /// # Errors
    ///
    /// [`EvalError`] if the tree references an unbound placeholder.
    pub fn apply(&self, items: Vec<Item>) -> Result<Vec<Item>, EvalError> {
        let Some(expression) = &self.expression else {
            return Ok(items);
        };
        let before = items.len();
        let mut kept = Vec::with_capacity(before);
        for item in items {
            let ctx = EvalContext {
                item: &item,
                names: &self.names,
                values: &self.values,
            };
            if ctx.evaluate(expression)? {
                kept.push(item);
            }
        }
        debug!(
            filter = %expression,
            discarded = before - kept.len(),
            "applied post-filter"
        );
        Ok(kept)
    }
}
