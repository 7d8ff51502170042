//! Filter-string parser.
//!
//! The input is split on whitespace and fed through a finite-state machine
//! with four states: field, operator, value, and logic. A [`Condition`] is
//! emitted, fully built, on every transition into the logic state, so no
//! partially filled condition is ever shared or mutated after the fact.
//!
//! Grammar (no grouping, no precedence, no `not`):
//!
//! ```text
//! filter    := condition (("and" | "or") condition)*
//! condition := field op value
//!            | startswith(field,'v') | endswith(field,'v')
//!            | contains(field,'v')   | substringof('v',field)
//! op        := eq | gt | ge | lt | le
//! ```
//!
//! Any token where `and`/`or` is expected ends parsing; the remaining tokens
//! are ignored.
//!
//! An apostrophe inside a quoted literal is written doubled (`'O''Brien'`). A
//! single inner quote leaves the literal open until the end of input, which
//! fails with [`ParseError::UnterminatedLiteral`] or
//! [`ParseError::MalformedFunction`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::condition::{Condition, ConditionList, Connector, Literal, Operator};
use crate::error::ParseError;

/// Comparison operator tokens.
const COMPARISON_OPERATORS: [(&str, Operator); 5] = [
    ("eq", Operator::Eq),
    ("gt", Operator::Gt),
    ("ge", Operator::Ge),
    ("lt", Operator::Lt),
    ("le", Operator::Le),
];

/// Function-form names, matched case-insensitively.
const FUNCTION_OPERATORS: [(&str, Operator); 4] = [
    ("startswith", Operator::StartsWith),
    ("endswith", Operator::EndsWith),
    ("contains", Operator::Contains),
    ("substringof", Operator::SubstringOf),
];

/// `name(field,'value')`
static FIELD_FIRST_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+\(\s*(?P<field>[^\s,'()]+)\s*,\s*'(?P<value>.*)'\s*\)$")
        .expect("field-first call pattern is valid")
});

/// `substringof('value',field)`
static VALUE_FIRST_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+\(\s*'(?P<value>.*)'\s*,\s*(?P<field>[^\s,'()]+)\s*\)$")
        .expect("value-first call pattern is valid")
});

const QUOTE: char = '\'';

#[derive(Debug)]
enum State {
    ExpectField {
        connector: Connector,
    },
    ExpectOp {
        connector: Connector,
        field: String,
    },
    ExpectValue {
        connector: Connector,
        field: String,
        operator: Operator,
        /// An open multi-token quoted literal, delimiters included.
        open: Option<String>,
    },
    ExpectLogic,
    Done,
}

enum ValueStep {
    Complete(Literal),
    Open(String),
}

/// Parse a filter string into conditions in evaluation order.
///
/// An empty or whitespace-only string yields an empty list.
///
/// # Examples
///
/// ```
/// use dynafilter_core::condition::{Connector, Literal, Operator};
/// use dynafilter_core::parse_filter;
///
/// let conditions = parse_filter("a eq '1' and b gt 2").unwrap();
/// assert_eq!(conditions.len(), 2);
/// assert_eq!(conditions[1].operator, Operator::Gt);
/// assert_eq!(conditions[1].value, Literal::Bare("2".to_owned()));
/// assert_eq!(conditions[1].connector, Connector::And);
/// ```
pub fn parse_filter(input: &str) -> Result<ConditionList, ParseError> {
    let mut tokens = input.split_whitespace();
    let mut conditions = ConditionList::new();
    let mut state = State::ExpectField {
        connector: Connector::None,
    };

    while let Some(token) = tokens.next() {
        state = match state {
            State::ExpectField { connector } => {
                if let Some(paren) = token.find('(') {
                    let call = gather_call(token, &mut tokens)?;
                    conditions.push(parse_call(&call, paren)?.joined(connector));
                    State::ExpectLogic
                } else {
                    State::ExpectOp {
                        connector,
                        field: token.to_owned(),
                    }
                }
            }
            State::ExpectOp { connector, field } => {
                let operator = lookup(&COMPARISON_OPERATORS, token).ok_or_else(|| {
                    ParseError::UnknownOperator {
                        token: token.to_owned(),
                    }
                })?;
                State::ExpectValue {
                    connector,
                    field,
                    operator,
                    open: None,
                }
            }
            State::ExpectValue {
                connector,
                field,
                operator,
                open,
            } => match read_value(open, token) {
                ValueStep::Complete(value) => {
                    conditions.push(Condition {
                        field,
                        operator,
                        value,
                        connector,
                    });
                    State::ExpectLogic
                }
                ValueStep::Open(text) => State::ExpectValue {
                    connector,
                    field,
                    operator,
                    open: Some(text),
                },
            },
            State::ExpectLogic => match token {
                "and" => State::ExpectField {
                    connector: Connector::And,
                },
                "or" => State::ExpectField {
                    connector: Connector::Or,
                },
                _ => {
                    let ignored: Vec<&str> = std::iter::once(token).chain(tokens.by_ref()).collect();
                    debug!(?ignored, "ignoring tokens after the last condition");
                    State::Done
                }
            },
            State::Done => State::Done,
        };

        if matches!(state, State::Done) {
            break;
        }
    }

    match state {
        State::ExpectField { connector } => {
            if connector != Connector::None {
                debug!(?connector, "dropping dangling connector at end of filter");
            }
        }
        State::ExpectOp { .. } => {
            return Err(ParseError::UnexpectedEnd {
                expected: "comparison operator",
            });
        }
        State::ExpectValue {
            open: Some(literal),
            ..
        } => return Err(ParseError::UnterminatedLiteral { literal }),
        State::ExpectValue { open: None, .. } => {
            return Err(ParseError::UnexpectedEnd { expected: "value" });
        }
        State::ExpectLogic | State::Done => {}
    }

    Ok(conditions)
}

fn lookup(table: &[(&str, Operator)], token: &str) -> Option<Operator> {
    table
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, operator)| *operator)
}

/// Consume one value token, continuing or closing a quoted literal.
fn read_value(open: Option<String>, token: &str) -> ValueStep {
    let text = match open {
        Some(mut text) => {
            text.push(' ');
            text.push_str(token);
            text
        }
        None if token.starts_with(QUOTE) => token.to_owned(),
        None => return ValueStep::Complete(Literal::Bare(token.to_owned())),
    };
    if literal_is_closed(&text) {
        ValueStep::Complete(Literal::Quoted(unescape(unquote(&text))))
    } else {
        ValueStep::Open(text)
    }
}

/// A quoted literal is closed once it ends on a quote that is not half of a
/// doubled pair.
fn literal_is_closed(text: &str) -> bool {
    text.len() >= 2 && text.ends_with(QUOTE) && text.matches(QUOTE).count() % 2 == 0
}

/// Strip one leading and one trailing quote. Callers guarantee both exist.
fn unquote(text: &str) -> &str {
    let inner = text.strip_prefix(QUOTE).unwrap_or(text);
    inner.strip_suffix(QUOTE).unwrap_or(inner)
}

/// Collapse doubled quotes inside a literal.
fn unescape(text: &str) -> String {
    text.replace("''", "'")
}

/// Re-join a function form whose quoted argument was split on whitespace.
fn gather_call<'a>(
    first: &str,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<String, ParseError> {
    let mut call = first.to_owned();
    while !call_is_closed(&call) {
        let Some(next) = tokens.next() else {
            return Err(ParseError::MalformedFunction { text: call });
        };
        call.push(' ');
        call.push_str(next);
    }
    Ok(call)
}

fn call_is_closed(call: &str) -> bool {
    call.ends_with(')') && call.matches(QUOTE).count() % 2 == 0
}

/// Parse a complete function form. `paren` is the byte offset of its `(`.
fn parse_call(call: &str, paren: usize) -> Result<Condition, ParseError> {
    let name = call[..paren].to_ascii_lowercase();
    let operator =
        lookup(&FUNCTION_OPERATORS, &name).ok_or(ParseError::UnknownFunction { name })?;

    let pattern = match operator {
        Operator::SubstringOf => &*VALUE_FIRST_CALL,
        _ => &*FIELD_FIRST_CALL,
    };
    let captures = pattern
        .captures(call)
        .ok_or_else(|| ParseError::MalformedFunction {
            text: call.to_owned(),
        })?;

    Ok(Condition::new(
        &captures["field"],
        operator,
        Literal::Quoted(unescape(&captures["value"])),
    ))
}
