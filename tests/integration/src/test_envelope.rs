//! Wire shape of the result envelope.

#[cfg(test)]
mod tests {
    use dynafilter_core::DynaFilterConfig;

    use crate::people_fixture;

    #[test]
    fn test_should_serialize_envelope_wire_shape() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'sales'"), None)
            .unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "d": {
                    "__count": 1,
                    "results": [{
                        "dept": "sales",
                        "id": 7,
                        "name": "Garth",
                        "age": 47,
                        "address": {"city": "Oslo"}
                    }]
                }
            })
        );
    }

    #[test]
    fn test_should_serialize_empty_result() {
        let fx = people_fixture(100, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("dept eq 'legal'"), None)
            .unwrap();
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"d":{"__count":0,"results":[]}}"#
        );
    }

    #[test]
    fn test_should_count_items_after_post_filter() {
        let fx = people_fixture(2, DynaFilterConfig::default());
        let envelope = fx
            .service
            .query_items(&fx.table, Some("endswith(name,'son')"), None)
            .unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["d"]["__count"], serde_json::json!(1));
        assert_eq!(json["d"]["results"][0]["name"], serde_json::json!("Johnson"));
    }
}
