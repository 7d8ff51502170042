//! Error taxonomy for a filter query request.
//!
//! Every variant aborts the request. Parse, validation and coercion failures
//! surface before any backend call is made.

use dynafilter_model::BackendError;

use crate::condition::Operator;
use crate::expression::evaluator::EvalError;

/// Malformed filter-string syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A function form did not match its expected shape.
    #[error("malformed function call: {text}")]
    MalformedFunction {
        /// The offending text.
        text: String,
    },
    /// A function form named a function that does not exist.
    #[error("unknown filter function: {name}")]
    UnknownFunction {
        /// The function name as written.
        name: String,
    },
    /// The token after a field name is not a comparison operator.
    #[error("unknown comparison operator: {token}")]
    UnknownOperator {
        /// The offending token.
        token: String,
    },
    /// A quoted literal was still open at end of input.
    #[error("unterminated quoted literal: {literal}")]
    UnterminatedLiteral {
        /// The text accumulated so far.
        literal: String,
    },
    /// Input ended in the middle of a condition.
    #[error("unexpected end of filter: expected {expected}")]
    UnexpectedEnd {
        /// What the parser was waiting for.
        expected: &'static str,
    },
}

/// A condition list the backend cannot serve as written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A key-eligible condition is joined with `or`.
    #[error("key attribute '{field}' cannot be joined with 'or'")]
    DisjunctiveKeyCondition {
        /// The key attribute.
        field: String,
    },
    /// An operator with no key-condition form was applied to a key attribute.
    #[error("operator '{operator}' is not supported on key attribute '{field}'")]
    UnsupportedKeyOperator {
        /// The key attribute.
        field: String,
        /// The rejected operator.
        operator: Operator,
    },
    /// An operator with no filter-expression form.
    #[error("operator '{operator}' has no filter form for attribute '{field}'")]
    UnsupportedFilterOperator {
        /// The attribute.
        field: String,
        /// The rejected operator.
        operator: Operator,
    },
}

/// Any failure of a filter query request.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The filter string could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// The parsed conditions cannot be planned or compiled.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// An unquoted literal is not an integer.
    #[error("type coercion error: value '{literal}' for '{field}' is not a valid integer")]
    TypeCoercion {
        /// The field the literal was compared against.
        field: String,
        /// The literal as written.
        literal: String,
    },
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The exact post-retrieval filter could not be evaluated.
    #[error("post-filter error: {0}")]
    Evaluation(#[from] EvalError),
}

impl QueryError {
    /// Short name of the error kind, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "ParseError",
            Self::Validation(_) => "ValidationError",
            Self::TypeCoercion { .. } => "TypeCoercionError",
            Self::Backend(_) => "BackendError",
            Self::Evaluation(_) => "EvaluationError",
        }
    }
}

/// Result alias for filter query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Convert an evaluation failure inside the in-memory backend into the
/// validation error a real backend would have returned.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn eval_error_to_backend(e: EvalError) -> BackendError {
    BackendError::validation(e.to_string())
}
