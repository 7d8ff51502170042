//! Integration tests for DynaFilter.
//!
//! Every test drives [`FilterQueryService`] end to end against a freshly
//! seeded [`MemoryBackend`]; no external services are needed.
//!
//! Run them with:
//! ```text
//! cargo test -p dynafilter-integration
//! ```

use std::sync::Once;

use dynafilter_core::{
    DynaFilterConfig, FilterQueryService, KeySchemaRegistry, MemoryBackend, TableKeys,
};
use dynafilter_model::{AttributeValue, Item};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Build an item from `(name, value)` pairs.
#[must_use]
pub fn item(pairs: &[(&str, AttributeValue)]) -> Item {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// A people table keyed by `dept` (partition) and `id` (sort).
#[derive(Debug)]
pub struct PeopleFixture {
    /// Table name.
    pub table: String,
    /// Service wired to the seeded backend.
    pub service: FilterQueryService<MemoryBackend>,
}

/// Rows seeded by [`people_fixture`]: `(dept, id, name, age, city)`.
pub const PEOPLE: &[(&str, i64, &str, i64, &str)] = &[
    ("eng", 1, "Smith", 41, "Oslo"),
    ("eng", 2, "Booth", 29, "Bergen"),
    ("eng", 3, "Smother", 35, "Oslo"),
    ("ops", 4, "Jones", 52, "Tromso"),
    ("ops", 5, "Johnson", 23, "Oslo"),
    ("ops", 6, "Keith", 38, "Bergen"),
    ("sales", 7, "Garth", 47, "Oslo"),
];

/// Seed a people table into a backend whose pages evaluate `page_size`
/// items, with `config` extended by the table's key schema.
#[must_use]
pub fn people_fixture(page_size: usize, config: DynaFilterConfig) -> PeopleFixture {
    init_tracing();

    let table = test_table_name("people");
    let keys = TableKeys::new("dept").with_sort_key("id");
    let backend = MemoryBackend::new().with_page_size(page_size);
    backend
        .create_table(table.clone(), keys.clone())
        .unwrap_or_else(|e| panic!("failed to create table {table}: {e}"));

    for (dept, id, name, age, city) in PEOPLE {
        let mut address = std::collections::HashMap::new();
        address.insert("city".to_owned(), AttributeValue::string(*city));
        let row = item(&[
            ("dept", AttributeValue::string(*dept)),
            ("id", AttributeValue::integer(*id)),
            ("name", AttributeValue::string(*name)),
            ("age", AttributeValue::integer(*age)),
            ("address", AttributeValue::M(address)),
        ]);
        backend
            .put_item(&table, row)
            .unwrap_or_else(|e| panic!("failed to seed {table}: {e}"));
    }

    let mut key_schemas: KeySchemaRegistry = config.key_schemas.clone();
    key_schemas.insert(table.clone(), keys.key_schema());
    let config = DynaFilterConfig {
        key_schemas,
        ..config
    };

    PeopleFixture {
        table,
        service: FilterQueryService::new(backend, config),
    }
}

/// Names of the items in an envelope, in result order.
#[must_use]
pub fn names(envelope: &dynafilter_model::ResultEnvelope) -> Vec<String> {
    envelope
        .results
        .iter()
        .filter_map(|i| i.get("name").and_then(AttributeValue::as_s))
        .map(ToOwned::to_owned)
        .collect()
}

mod test_envelope;
mod test_errors;
mod test_query;
mod test_scan;
