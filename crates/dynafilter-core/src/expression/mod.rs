//! Predicate trees for DynamoDB key-condition and filter expressions.
//!
//! The pipeline is:
//!
//! 1. **Compiling**: fold planned conditions into [`Expr`] trees and allocate
//!    attribute name and value aliases.
//! 2. **Rendering**: `Display` on [`Expr`] produces DynamoDB expression syntax.
//! 3. **Evaluation**: [`EvalContext`] walks a tree against an item; used by the
//!    in-memory backend.

pub mod ast;
pub mod compiler;
pub mod evaluator;

pub use ast::{AttributeRef, CompareOp, Expr, FunctionName, LogicalOp};
pub use compiler::{CompiledQuery, compile};
pub use evaluator::{EvalContext, EvalError, compare_numbers, parse_number};
