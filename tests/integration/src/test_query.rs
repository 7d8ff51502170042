//! Indexed lookups: filters with at least one key condition.

#[cfg(test)]
mod tests {
    use dynafilter_core::DynaFilterConfig;
    use dynafilter_model::BackendOperation;

    use crate::{names, people_fixture};

    #[test]
    fn test_should_query_partition_in_sort_order() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let prepared = fx
            .service
            .prepare(&fx.table, Some("dept eq 'eng'"), None)
            .unwrap();
        assert_eq!(prepared.request.operation(), BackendOperation::Query);

        let envelope = fx.service.execute(&prepared).unwrap();
        assert_eq!(names(&envelope), ["Smith", "Booth", "Smother"]);
    }

    #[test]
    fn test_should_combine_key_and_filter_conditions() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'ops' and age gt 30"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Jones", "Keith"]);
    }

    #[test]
    fn test_should_apply_sort_key_range() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'eng' and id ge 2"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Booth", "Smother"]);
    }

    #[test]
    fn test_should_filter_with_startswith_on_non_key() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'ops' and startswith(name,'Jo')"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Jones", "Johnson"]);
    }

    #[test]
    fn test_should_collect_query_across_single_item_pages() {
        let fx = people_fixture(1, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'ops' and age lt 40"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Johnson", "Keith"]);
        assert_eq!(envelope.count, 2);
    }

    #[test]
    fn test_should_allow_disjunction_before_first_key_condition() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(
                &fx.table,
                Some("name eq 'Smith' or name eq 'Booth' and dept eq 'eng'"),
                None,
            )
            .unwrap();
        assert_eq!(names(&envelope), ["Smith", "Booth"]);
    }

    #[test]
    fn test_should_resolve_dotted_path_through_nested_map() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'eng' and address.city eq 'Oslo'"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Smith", "Smother"]);
    }

    #[test]
    fn test_should_pass_projection_through_to_backend() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'sales'"), Some("name, age"))
            .unwrap();
        assert_eq!(envelope.count, 1);
        let row = &envelope.results[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row["name"].as_s(), Some("Garth"));
        assert_eq!(row["age"].as_n(), Some("47"));
    }

    #[test]
    fn test_should_apply_exact_suffix_within_partition() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let prepared = fx
            .service
            .prepare(&fx.table, Some("dept eq 'eng' and endswith(name,'th')"), None)
            .unwrap();
        assert!(prepared.has_post_filter());
        assert_eq!(
            prepared.request.to_json().unwrap()["FilterExpression"],
            serde_json::json!("contains(#name, :name)")
        );

        let envelope = fx.service.execute(&prepared).unwrap();
        assert_eq!(names(&envelope), ["Smith", "Booth"]);
        assert_eq!(envelope.count, 2);
    }

    #[test]
    fn test_should_return_first_page_only() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_first_page(&fx.table, Some("dept eq 'ops'"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Jones", "Johnson"]);
        assert_eq!(envelope.count, 2);
    }
}
