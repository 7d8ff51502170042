//! Every failure aborts the request; none degrade to an empty envelope.

#[cfg(test)]
mod tests {
    use dynafilter_core::{DynaFilterConfig, Operator, ParseError, QueryError, ValidationError};
    use dynafilter_model::BackendErrorCode;

    use crate::people_fixture;

    #[test]
    fn test_should_report_parse_errors() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let run = |filter: &str| fx.service.query_items(&fx.table, Some(filter), None);

        assert!(matches!(
            run("age ne 3"),
            Err(QueryError::Parse(ParseError::UnknownOperator { .. }))
        ));
        assert!(matches!(
            run("startswith(name 'Jo')"),
            Err(QueryError::Parse(ParseError::MalformedFunction { .. }))
        ));
        assert!(matches!(
            run("name eq 'John Smith"),
            Err(QueryError::Parse(ParseError::UnterminatedLiteral { .. }))
        ));
        assert!(matches!(
            run("matches(name,'x')"),
            Err(QueryError::Parse(ParseError::UnknownFunction { .. }))
        ));
    }

    #[test]
    fn test_should_reject_disjunction_on_key_condition() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let err = fx
            .service
            .query_items(&fx.table, Some("dept eq 'eng' or age gt 3"), None)
            .unwrap_err();
        match err {
            QueryError::Validation(ValidationError::DisjunctiveKeyCondition { field }) => {
                assert_eq!(field, "dept");
            }
            other => panic!("expected DisjunctiveKeyCondition, got {other:?}"),
        }
    }

    #[test]
    fn test_should_reject_unsupported_operator_on_key() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let err = fx
            .service
            .query_items(&fx.table, Some("endswith(dept,'ng')"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Validation(ValidationError::UnsupportedKeyOperator {
                operator: Operator::EndsWith,
                ..
            })
        ));
    }

    #[test]
    fn test_should_reject_non_integer_bare_literal() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let err = fx
            .service
            .query_items(&fx.table, Some("age gt old"), None)
            .unwrap_err();
        assert_eq!(err.kind(), "TypeCoercionError");
    }

    #[test]
    fn test_should_pass_backend_errors_through_unchanged() {
        let fx = people_fixture(100, DynaFilterConfig::default());

        let missing = fx.service.scan_all("no-such-table").unwrap_err();
        let QueryError::Backend(missing) = missing else {
            panic!("expected backend error");
        };
        assert_eq!(missing.code, BackendErrorCode::ResourceNotFoundException);

        // A sort-key-only condition is a `Query` the backend refuses.
        let refused = fx
            .service
            .query_items(&fx.table, Some("id gt 3"), None)
            .unwrap_err();
        let QueryError::Backend(refused) = refused else {
            panic!("expected backend error");
        };
        assert_eq!(refused.code, BackendErrorCode::ValidationException);
        assert!(refused.message.contains("dept"));
    }
}
