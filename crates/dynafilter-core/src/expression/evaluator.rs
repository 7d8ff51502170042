//! Expression evaluator for compiled predicate trees.
//!
//! The evaluator resolves `#name` and `:value` placeholders against the alias
//! maps of a request and evaluates a tree against one item. It backs the
//! in-memory backend; a real DynamoDB endpoint performs the same work
//! server-side.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use dynafilter_model::attribute_value::lookup_path;
use dynafilter_model::{AttributeValue, Item};
use rust_decimal::Decimal;

use super::ast::{AttributeRef, CompareOp, Expr, FunctionName, LogicalOp};

/// A placeholder with no binding in the request's alias maps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// `#name` missing from the attribute names.
    #[error("unresolved expression attribute name: {placeholder}")]
    UnresolvedName {
        /// The placeholder as written.
        placeholder: String,
    },
    /// `:value` missing from the attribute values.
    #[error("unresolved expression attribute value: {placeholder}")]
    UnresolvedValue {
        /// The placeholder as written.
        placeholder: String,
    },
}

// ---------------------------------------------------------------------------
// Evaluation context
// ---------------------------------------------------------------------------

/// Binds an item to a request's alias maps.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// The item being evaluated.
    pub item: &'a Item,
    /// `#alias` to attribute name or path.
    pub names: &'a BTreeMap<String, String>,
    /// `:alias` to value.
    pub values: &'a BTreeMap<String, AttributeValue>,
}

impl EvalContext<'_> {
    /// Evaluate `expr` against the item.
    ///
    /// A predicate on a missing attribute is false.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if a placeholder is not bound.
    pub fn evaluate(&self, expr: &Expr) -> Result<bool, EvalError> {
        match expr {
            Expr::Compare {
                attribute,
                op,
                value,
            } => {
                let expected = self.resolve_value(value)?;
                Ok(self
                    .resolve_attribute(attribute)?
                    .is_some_and(|actual| compare_values(actual, expected, *op)))
            }
            Expr::Function {
                name,
                attribute,
                value,
            } => {
                let operand = self.resolve_value(value)?;
                Ok(self
                    .resolve_attribute(attribute)?
                    .is_some_and(|actual| match name {
                        FunctionName::BeginsWith => begins_with(actual, operand),
                        FunctionName::Contains => contains(actual, operand),
                        FunctionName::EndsWith => ends_with(actual, operand),
                    }))
            }
            Expr::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(self.evaluate(left)? && self.evaluate(right)?),
                LogicalOp::Or => Ok(self.evaluate(left)? || self.evaluate(right)?),
            },
        }
    }

    /// Resolve an attribute reference to the item's value, if present.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnresolvedName`] if the alias is not bound.
    pub fn resolve_attribute(
        &self,
        attribute: &AttributeRef,
    ) -> Result<Option<&AttributeValue>, EvalError> {
        let placeholder = attribute.placeholder();
        let path = self
            .names
            .get(&placeholder)
            .ok_or(EvalError::UnresolvedName { placeholder })?;
        Ok(lookup_path(self.item, path))
    }

    fn resolve_value(&self, placeholder: &str) -> Result<&AttributeValue, EvalError> {
        self.values
            .get(placeholder)
            .ok_or_else(|| EvalError::UnresolvedValue {
                placeholder: placeholder.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Compare two values; operands of different types only ever compare unequal.
fn compare_values(left: &AttributeValue, right: &AttributeValue, op: CompareOp) -> bool {
    let ordering = match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AttributeValue::N(a), AttributeValue::N(b)) => compare_numbers(a, b),
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(ordering) => match op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        },
        None => op == CompareOp::Eq && left == right,
    }
}

fn begins_with(actual: &AttributeValue, prefix: &AttributeValue) -> bool {
    match (actual, prefix) {
        (AttributeValue::S(s), AttributeValue::S(p)) => s.starts_with(p.as_str()),
        (AttributeValue::B(b), AttributeValue::B(p)) => b.starts_with(p),
        _ => false,
    }
}

fn ends_with(actual: &AttributeValue, suffix: &AttributeValue) -> bool {
    match (actual, suffix) {
        (AttributeValue::S(s), AttributeValue::S(p)) => s.ends_with(p.as_str()),
        (AttributeValue::B(b), AttributeValue::B(p)) => b.ends_with(p),
        _ => false,
    }
}

fn contains(actual: &AttributeValue, operand: &AttributeValue) -> bool {
    match (actual, operand) {
        (AttributeValue::S(s), AttributeValue::S(sub)) => s.contains(sub.as_str()),
        (AttributeValue::Ss(set), AttributeValue::S(member)) => set.contains(member),
        (AttributeValue::Ns(set), AttributeValue::N(member)) => set
            .iter()
            .any(|n| compare_numbers(n, member) == Some(Ordering::Equal)),
        (AttributeValue::Bs(set), AttributeValue::B(member)) => set.contains(member),
        (AttributeValue::L(list), _) => list
            .iter()
            .any(|element| compare_values(element, operand, CompareOp::Eq)),
        _ => false,
    }
}

/// Parse a DynamoDB number string exactly.
///
/// Plain and exponent forms (`1.5`, `15E-1`) are accepted. Text that is not a
/// number, or needs more precision than a 96-bit decimal mantissa, yields
/// `None`; nothing is ever rounded.
#[must_use]
pub fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str_exact(text).ok()
    }
}

/// Order two DynamoDB number strings by value.
///
/// Returns `None` when either side does not parse with [`parse_number`].
#[must_use]
pub fn compare_numbers(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_number(a)?.cmp(&parse_number(b)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
