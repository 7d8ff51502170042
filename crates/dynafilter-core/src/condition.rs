//! The condition model shared by every stage of the pipeline.

use std::fmt;

use dynafilter_model::AttributeValue;

use crate::error::{QueryError, QueryResult};

/// A filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `eq`
    Eq,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
    /// `lt`
    Lt,
    /// `le`
    Le,
    /// `startswith(field,'v')`
    StartsWith,
    /// `endswith(field,'v')`
    EndsWith,
    /// `contains(field,'v')`
    Contains,
    /// `substringof('v',field)`
    SubstringOf,
}

impl Operator {
    /// The operator name as written in a filter string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Contains => "contains",
            Self::SubstringOf => "substringof",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a condition joins the condition before it.
///
/// The first condition of a list always carries [`Connector::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connector {
    /// First condition; nothing to join.
    #[default]
    None,
    /// `and`
    And,
    /// `or`
    Or,
}

/// A literal exactly as the filter string wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// A quoted literal with its delimiting quotes removed.
    Quoted(String),
    /// An unquoted literal, coerced to an integer at compile time.
    Bare(String),
}

impl Literal {
    /// The literal text without delimiters.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Quoted(s) | Self::Bare(s) => s,
        }
    }
}

/// A literal after type coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
}

impl TypedValue {
    /// Convert to the backend representation.
    #[must_use]
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Self::String(s) => AttributeValue::string(s.clone()),
            Self::Integer(n) => AttributeValue::integer(*n),
        }
    }
}

/// One predicate of a filter string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Attribute name, possibly a dotted document path.
    pub field: String,
    /// The operator.
    pub operator: Operator,
    /// The literal compared against.
    pub value: Literal,
    /// How this condition joins the previous one.
    pub connector: Connector,
}

/// Conditions in evaluation order.
pub type ConditionList = Vec<Condition>;

impl Condition {
    /// Create a condition with no connector.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: Literal) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            connector: Connector::None,
        }
    }

    /// Set how this condition joins the previous one.
    #[must_use]
    pub fn joined(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    /// Coerce the literal: quoted text is a string, unquoted text must be an
    /// integer.
    pub fn typed_value(&self) -> QueryResult<TypedValue> {
        match &self.value {
            Literal::Quoted(s) => Ok(TypedValue::String(s.clone())),
            Literal::Bare(raw) => {
                raw.parse::<i64>()
                    .map(TypedValue::Integer)
                    .map_err(|_| QueryError::TypeCoercion {
                        field: self.field.clone(),
                        literal: raw.clone(),
                    })
            }
        }
    }
}
