//! AST types for compiled predicates.
//!
//! Leaves are comparisons and the two function predicates DynamoDB offers for
//! strings (`begins_with`, `contains`); inner nodes are binary `AND`/`OR`
//! nodes built by a left fold. Every leaf refers to its attribute through a
//! `#name` placeholder and to its operand through a `:value` placeholder, so the
//! rendered text never contains a reserved word or a raw literal.

use std::fmt;

/// An attribute reached through an expression attribute name placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef {
    /// Alias without the leading `#`.
    pub alias: String,
    /// The attribute name or dotted document path the alias stands for.
    pub path: String,
}

impl AttributeRef {
    /// The `#alias` placeholder used in expression text.
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("#{}", self.alias)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`).
    Eq,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// String predicate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `begins_with(path, substr)`; the only function allowed in a key condition.
    BeginsWith,
    /// `contains(path, operand)`: substring, set membership or list element.
    Contains,
    /// Exact suffix test. DynamoDB has no such function; it only appears in
    /// trees evaluated in memory after retrieval.
    EndsWith,
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Contains => write!(f, "contains"),
            Self::EndsWith => write!(f, "ends_with"),
        }
    }
}

/// Compiled predicate tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `#attr op :value`
    Compare {
        /// Attribute operand.
        attribute: AttributeRef,
        /// Comparison operator.
        op: CompareOp,
        /// Value placeholder, including the leading `:`.
        value: String,
    },
    /// `name(#attr, :value)`
    Function {
        /// Function name.
        name: FunctionName,
        /// Attribute operand.
        attribute: AttributeRef,
        /// Value placeholder, including the leading `:`.
        value: String,
    },
    /// `left op right`
    Logical {
        /// Logical operator.
        op: LogicalOp,
        /// Left-hand expression.
        left: Box<Expr>,
        /// Right-hand expression.
        right: Box<Expr>,
    },
}

impl Expr {
    /// Combine two trees under a logical node.
    #[must_use]
    pub fn combine(op: LogicalOp, left: Self, right: Self) -> Self {
        Self::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Whether any logical node in the tree is an `OR`.
    #[must_use]
    pub fn has_disjunction(&self) -> bool {
        match self {
            Self::Logical { op, left, right } => {
                *op == LogicalOp::Or || left.has_disjunction() || right.has_disjunction()
            }
            Self::Compare { .. } | Self::Function { .. } => false,
        }
    }

    /// Leaf predicates from left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Self>) {
        match self {
            Self::Logical { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
            Self::Compare { .. } | Self::Function { .. } => out.push(self),
        }
    }

    /// The attribute of a leaf predicate.
    #[must_use]
    pub fn attribute(&self) -> Option<&AttributeRef> {
        match self {
            Self::Compare { attribute, .. } | Self::Function { attribute, .. } => Some(attribute),
            Self::Logical { .. } => None,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(self, Self::Logical { .. }) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
            } => write!(f, "{} {op} {value}", attribute.placeholder()),
            Self::Function {
                name,
                attribute,
                value,
            } => write!(f, "{name}({}, {value})", attribute.placeholder()),
            Self::Logical { op, left, right } => {
                left.fmt_operand(f)?;
                write!(f, " {op} ")?;
                right.fmt_operand(f)
            }
        }
    }
}
