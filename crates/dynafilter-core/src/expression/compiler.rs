//! Compiles a [`QueryPlan`] into predicate trees and attribute aliases.

use std::collections::BTreeMap;

use dynafilter_model::AttributeValue;

use super::ast::{AttributeRef, CompareOp, Expr, FunctionName, LogicalOp};
use crate::condition::{Condition, Connector, Operator};
use crate::error::{QueryResult, ValidationError};
use crate::planner::QueryPlan;

/// The backend predicate a filter operator compiles to.
#[derive(Debug, Clone, Copy)]
enum Predicate {
    Compare(CompareOp),
    Function(FunctionName),
}

/// Operators allowed in a key condition.
const KEY_OPERATORS: [(Operator, Predicate); 6] = [
    (Operator::Eq, Predicate::Compare(CompareOp::Eq)),
    (Operator::Gt, Predicate::Compare(CompareOp::Gt)),
    (Operator::Ge, Predicate::Compare(CompareOp::Ge)),
    (Operator::Lt, Predicate::Compare(CompareOp::Lt)),
    (Operator::Le, Predicate::Compare(CompareOp::Le)),
    (Operator::StartsWith, Predicate::Function(FunctionName::BeginsWith)),
];

/// Operators allowed in a filter condition.
///
/// `endswith` and `substringof` have no backend counterpart and compile to
/// `contains`; `endswith` is tightened by the post-filter.
const FILTER_OPERATORS: [(Operator, Predicate); 9] = [
    (Operator::Eq, Predicate::Compare(CompareOp::Eq)),
    (Operator::Gt, Predicate::Compare(CompareOp::Gt)),
    (Operator::Ge, Predicate::Compare(CompareOp::Ge)),
    (Operator::Lt, Predicate::Compare(CompareOp::Lt)),
    (Operator::Le, Predicate::Compare(CompareOp::Le)),
    (Operator::StartsWith, Predicate::Function(FunctionName::BeginsWith)),
    (Operator::Contains, Predicate::Function(FunctionName::Contains)),
    (Operator::EndsWith, Predicate::Function(FunctionName::Contains)),
    (Operator::SubstringOf, Predicate::Function(FunctionName::Contains)),
];

/// Filter operators whose backend predicate only approximates them, with the
/// exact predicate evaluated after retrieval.
const EXACT_OVERRIDES: [(Operator, Predicate); 1] = [(
    Operator::EndsWith,
    Predicate::Function(FunctionName::EndsWith),
)];

fn lookup(table: &[(Operator, Predicate)], operator: Operator) -> Option<Predicate> {
    table
        .iter()
        .find(|(op, _)| *op == operator)
        .map(|(_, predicate)| *predicate)
}

/// Backend-ready expressions for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    /// Key-condition tree; present only for a `Query`.
    pub key_expression: Option<Expr>,
    /// Filter tree applied by the backend after key selection.
    pub filter_expression: Option<Expr>,
    /// Exact form of `filter_expression`, present only when the backend
    /// filter approximates one of its predicates. Shares its aliases.
    pub exact_filter: Option<Expr>,
    /// `#alias` to attribute name or path.
    pub attribute_names: BTreeMap<String, String>,
    /// `:alias` to typed value.
    pub attribute_values: BTreeMap<String, AttributeValue>,
    /// Projection expression, passed through unchanged.
    pub projection: Option<String>,
}

impl CompiledQuery {
    /// Rendered key-condition expression.
    #[must_use]
    pub fn key_condition_text(&self) -> Option<String> {
        self.key_expression.as_ref().map(ToString::to_string)
    }

    /// Rendered filter expression.
    #[must_use]
    pub fn filter_text(&self) -> Option<String> {
        self.filter_expression.as_ref().map(ToString::to_string)
    }
}

/// Alias allocation for one compiled query.
#[derive(Debug, Default)]
struct Aliases {
    names: BTreeMap<String, String>,
    values: BTreeMap<String, AttributeValue>,
}

impl Aliases {
    /// Alias for `field`; a field seen before reuses its alias.
    fn attribute(&mut self, field: &str) -> AttributeRef {
        let base = flatten(field);
        let mut alias = base.clone();
        let mut suffix = 0;
        loop {
            let placeholder = format!("#{alias}");
            match self.names.get(&placeholder) {
                Some(path) if path == field => break,
                Some(_) => {
                    suffix += 1;
                    alias = format!("{base}_{suffix}");
                }
                None => {
                    self.names.insert(placeholder, field.to_owned());
                    break;
                }
            }
        }
        AttributeRef {
            alias,
            path: field.to_owned(),
        }
    }

    /// A fresh `:alias` bound to `value`.
    fn value(&mut self, field: &str, value: AttributeValue) -> String {
        let base = flatten(field);
        let mut placeholder = format!(":{base}");
        let mut suffix = 0;
        while self.values.contains_key(&placeholder) {
            suffix += 1;
            placeholder = format!(":{base}_{suffix}");
        }
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    /// Allocate the attribute and value aliases of one condition.
    fn operands(&mut self, condition: &Condition) -> QueryResult<(AttributeRef, String)> {
        let value = condition.typed_value()?.to_attribute_value();
        let attribute = self.attribute(&condition.field);
        let value = self.value(&condition.field, value);
        Ok((attribute, value))
    }
}

fn leaf(predicate: Predicate, attribute: AttributeRef, value: String) -> Expr {
    match predicate {
        Predicate::Compare(op) => Expr::Compare {
            attribute,
            op,
            value,
        },
        Predicate::Function(name) => Expr::Function {
            name,
            attribute,
            value,
        },
    }
}

fn fold(acc: Option<Expr>, op: LogicalOp, next: Expr) -> Expr {
    match acc {
        Some(acc) => Expr::combine(op, acc, next),
        None => next,
    }
}

/// Replace every character a placeholder cannot hold with `_`.
fn flatten(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Compile a plan.
///
/// Key conditions fold with `AND`. Filter conditions fold strictly left to
/// right, each joining the accumulated tree with its own connector. When a
/// filter operator is approximated for the backend, the same fold is also
/// built with exact predicates into [`CompiledQuery::exact_filter`].
///
/// # Errors
///
/// [`ValidationError::UnsupportedKeyOperator`] for a key condition whose
/// operator has no key form, [`ValidationError::UnsupportedFilterOperator`]
/// for a filter condition with no filter form, and `TypeCoercion` for an
/// unquoted non-integer literal.
pub fn compile(plan: &QueryPlan, projection: Option<&str>) -> QueryResult<CompiledQuery> {
    let mut aliases = Aliases::default();

    let mut key_expression: Option<Expr> = None;
    for condition in &plan.key_conditions {
        let predicate = lookup(&KEY_OPERATORS, condition.operator).ok_or_else(|| {
            ValidationError::UnsupportedKeyOperator {
                field: condition.field.clone(),
                operator: condition.operator,
            }
        })?;
        let (attribute, value) = aliases.operands(condition)?;
        key_expression = Some(fold(
            key_expression,
            LogicalOp::And,
            leaf(predicate, attribute, value),
        ));
    }

    let mut filter_expression: Option<Expr> = None;
    let mut exact_filter: Option<Expr> = None;
    let mut approximated = false;
    for condition in &plan.filter_conditions {
        let predicate = lookup(&FILTER_OPERATORS, condition.operator).ok_or_else(|| {
            ValidationError::UnsupportedFilterOperator {
                field: condition.field.clone(),
                operator: condition.operator,
            }
        })?;
        let exact = lookup(&EXACT_OVERRIDES, condition.operator);
        approximated |= exact.is_some();

        let op = if condition.connector == Connector::Or {
            LogicalOp::Or
        } else {
            LogicalOp::And
        };
        let (attribute, value) = aliases.operands(condition)?;
        exact_filter = Some(fold(
            exact_filter,
            op,
            leaf(exact.unwrap_or(predicate), attribute.clone(), value.clone()),
        ));
        filter_expression = Some(fold(filter_expression, op, leaf(predicate, attribute, value)));
    }

    Ok(CompiledQuery {
        key_expression,
        filter_expression,
        exact_filter: exact_filter.filter(|_| approximated),
        attribute_names: aliases.names,
        attribute_values: aliases.values,
        projection: projection.map(ToOwned::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::parser::parse_filter;
    use crate::planner::{KeySchema, plan};

    fn compile_filter(filter: &str, schema: &[&str]) -> QueryResult<CompiledQuery> {
        let schema = KeySchema::new(schema.iter().copied());
        let conditions = parse_filter(filter)?;
        let plan = plan(&conditions, Some(&schema))?;
        compile(&plan, None)
    }

    #[test]
    fn test_should_compile_key_and_filter_expressions() {
        let compiled = compile_filter("pk eq 'u1' and age gt 30", &["pk", "sk"]).unwrap();
        assert_eq!(compiled.key_condition_text().unwrap(), "#pk = :pk");
        assert_eq!(compiled.filter_text().unwrap(), "#age > :age");
        assert_eq!(compiled.attribute_names["#pk"], "pk");
        assert_eq!(compiled.attribute_values[":pk"], AttributeValue::string("u1"));
        assert_eq!(compiled.attribute_values[":age"], AttributeValue::integer(30));
    }

    #[test]
    fn test_should_fold_key_conditions_with_and() {
        let compiled =
            compile_filter("pk eq 'u1' and startswith(sk,'2024')", &["pk", "sk"]).unwrap();
        assert_eq!(
            compiled.key_condition_text().unwrap(),
            "#pk = :pk AND begins_with(#sk, :sk)"
        );
        assert!(compiled.filter_expression.is_none());
    }

    #[test]
    fn test_should_fold_filter_left_to_right_with_own_connectors() {
        let compiled = compile_filter("a eq 1 or b eq 2 and c eq 3", &["pk"]).unwrap();
        assert_eq!(
            compiled.filter_text().unwrap(),
            "(#a = :a OR #b = :b) AND #c = :c"
        );
        assert!(compiled.key_expression.is_none());
    }

    #[test]
    fn test_should_compile_endswith_and_substringof_to_contains() {
        let compiled =
            compile_filter("endswith(name,'th') and substringof('os',city)", &["pk"]).unwrap();
        assert_eq!(
            compiled.filter_text().unwrap(),
            "contains(#name, :name) AND contains(#city, :city)"
        );
        assert_eq!(
            compiled.exact_filter.unwrap().to_string(),
            "ends_with(#name, :name) AND contains(#city, :city)"
        );
    }

    #[test]
    fn test_should_keep_connectors_in_exact_filter() {
        let compiled = compile_filter("endswith(name,'th') or age gt 50", &["pk"]).unwrap();
        assert_eq!(
            compiled.exact_filter.unwrap().to_string(),
            "ends_with(#name, :name) OR #age > :age"
        );
    }

    #[test]
    fn test_should_omit_exact_filter_when_backend_filter_is_exact() {
        let compiled =
            compile_filter("substringof('os',city) or startswith(name,'J')", &["pk"]).unwrap();
        assert!(compiled.filter_expression.is_some());
        assert!(compiled.exact_filter.is_none());
    }

    #[test]
    fn test_should_give_every_operator_a_filter_form() {
        let operators = [
            Operator::Eq,
            Operator::Gt,
            Operator::Ge,
            Operator::Lt,
            Operator::Le,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::Contains,
            Operator::SubstringOf,
        ];
        for operator in operators {
            let plan = QueryPlan {
                key_conditions: Vec::new(),
                filter_conditions: vec![Condition::new(
                    "f",
                    operator,
                    crate::condition::Literal::Quoted("v".to_owned()),
                )],
            };
            assert!(compile(&plan, None).is_ok(), "{operator} has no filter form");
        }
    }

    #[test]
    fn test_should_flatten_dotted_path_alias() {
        let compiled = compile_filter("address.city eq 'Oslo'", &["pk"]).unwrap();
        assert_eq!(compiled.filter_text().unwrap(), "#address_city = :address_city");
        assert_eq!(compiled.attribute_names["#address_city"], "address.city");
    }

    #[test]
    fn test_should_deduplicate_value_aliases_for_repeated_field() {
        let compiled = compile_filter("age gt 1 and age lt 9", &["pk"]).unwrap();
        assert_eq!(compiled.filter_text().unwrap(), "#age > :age AND #age < :age_1");
        assert_eq!(compiled.attribute_names.len(), 1);
        assert_eq!(compiled.attribute_values[":age_1"], AttributeValue::integer(9));
    }

    #[test]
    fn test_should_separate_colliding_name_aliases() {
        let compiled = compile_filter("a.b eq 'x' and a_b eq 'y'", &["pk"]).unwrap();
        assert_eq!(compiled.attribute_names["#a_b"], "a.b");
        assert_eq!(compiled.attribute_names["#a_b_1"], "a_b");
        assert_eq!(
            compiled.filter_text().unwrap(),
            "#a_b = :a_b AND #a_b_1 = :a_b_1"
        );
    }

    #[test]
    fn test_should_reject_unsupported_key_operator() {
        let result = compile_filter("endswith(pk,'x')", &["pk"]);
        assert!(matches!(
            result,
            Err(QueryError::Validation(ValidationError::UnsupportedKeyOperator {
                operator: Operator::EndsWith,
                ..
            }))
        ));
    }

    #[test]
    fn test_should_report_type_coercion_failure() {
        let result = compile_filter("age gt abc", &["pk"]);
        assert!(matches!(result, Err(QueryError::TypeCoercion { .. })));
    }

    #[test]
    fn test_should_pass_projection_through() {
        let plan = QueryPlan::default();
        let compiled = compile(&plan, Some("name, age")).unwrap();
        assert_eq!(compiled.projection.as_deref(), Some("name, age"));
        assert!(compiled.attribute_names.is_empty());
    }

    #[test]
    fn test_should_compile_identically_twice() {
        let schema = KeySchema::new(["pk", "sk"]);
        let conditions =
            parse_filter("name eq 'x' or contains(tags,'y') and pk eq 'a' and sk ge 3").unwrap();
        let planned = plan(&conditions, Some(&schema)).unwrap();
        let first = compile(&planned, Some("name")).unwrap();
        let second = compile(&planned, Some("name")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.key_condition_text().unwrap(), "#pk = :pk AND #sk >= :sk");
    }
}
