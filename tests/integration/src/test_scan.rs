//! Full-table passes: filters with no key condition, and no filter at all.

#[cfg(test)]
mod tests {
    use dynafilter_core::DynaFilterConfig;
    use dynafilter_model::BackendOperation;

    use crate::{PEOPLE, names, people_fixture};

    #[test]
    fn test_should_collect_every_page_of_unfiltered_scan() {
        // Seven items at two per page: three pages with a cursor, then one without.
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx.service.scan_all(&fx.table).unwrap();
        assert_eq!(envelope.count, 7);
        assert_eq!(envelope.count, PEOPLE.len());
        assert_eq!(names(&envelope)[0], "Smith");
        assert_eq!(names(&envelope)[6], "Garth");
    }

    #[test]
    fn test_should_treat_blank_filter_as_full_scan() {
        let fx = people_fixture(3, DynaFilterConfig::default());
        let prepared = fx.service.prepare(&fx.table, Some("   "), None).unwrap();
        assert!(prepared.conditions.is_empty());
        assert_eq!(prepared.request.operation(), BackendOperation::Scan);
        assert_eq!(fx.service.execute(&prepared).unwrap().count, 7);
    }

    #[test]
    fn test_should_scan_when_only_non_key_conditions() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let prepared = fx
            .service
            .prepare(&fx.table, Some("address.city eq 'Bergen'"), None)
            .unwrap();
        assert_eq!(prepared.request.operation(), BackendOperation::Scan);
        let envelope = fx.service.execute(&prepared).unwrap();
        assert_eq!(names(&envelope), ["Booth", "Keith"]);
    }

    #[test]
    fn test_should_post_filter_endswith_across_pages() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("endswith(name,'th')"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Smith", "Booth", "Keith", "Garth"]);
        assert_eq!(envelope.count, 4);
    }

    #[test]
    fn test_should_keep_or_branch_matches_after_post_filter() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("endswith(name,'th') or age gt 50"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Smith", "Booth", "Jones", "Keith", "Garth"]);
    }

    #[test]
    fn test_should_force_scan_despite_key_disjunction() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let filter = Some("dept eq 'ops' or age lt 30");
        assert!(fx.service.query_items(&fx.table, filter, None).is_err());

        let prepared = fx.service.prepare_scan(&fx.table, filter, None).unwrap();
        assert_eq!(prepared.request.operation(), BackendOperation::Scan);

        let envelope = fx.service.scan_items(&fx.table, filter, None).unwrap();
        assert_eq!(names(&envelope), ["Booth", "Jones", "Johnson", "Keith"]);
    }

    #[test]
    fn test_should_match_substringof_exactly_without_post_filter() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("substringof('mit',name)"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Smith"]);
    }

    #[test]
    fn test_should_union_disjunction_of_filter_conditions() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("age lt 30 or age gt 50"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Booth", "Jones", "Johnson"]);
    }

    #[test]
    fn test_should_fold_connectors_strictly_left_to_right() {
        // (age < 30 or name = Garth) and city = Bergen; no precedence for `and`.
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(
                &fx.table,
                Some("age lt 30 or name eq 'Garth' and address.city eq 'Bergen'"),
                None,
            )
            .unwrap();
        assert_eq!(names(&envelope), ["Booth"]);
    }

    #[test]
    fn test_should_ignore_tokens_after_last_condition() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("name eq 'Keith' garbage and more"), None)
            .unwrap();
        assert_eq!(names(&envelope), ["Keith"]);
    }

    #[test]
    fn test_should_forward_configured_page_limit() {
        let config = DynaFilterConfig::builder()
            .page_limit(Some(3))
            .consistent_read(true)
            .build();
        let fx = people_fixture(100, config);
        let prepared = fx.service.prepare(&fx.table, None, None).unwrap();
        assert_eq!(prepared.request.to_json().unwrap()["Limit"], serde_json::json!(3));
        assert_eq!(prepared.request.to_json().unwrap()["ConsistentRead"], serde_json::json!(true));
        assert_eq!(fx.service.execute(&prepared).unwrap().count, 7);
    }
}
