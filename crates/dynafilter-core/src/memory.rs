//! In-memory reference backend.
//!
//! Serves `Query` and `Scan` pages the way DynamoDB does: items are ordered by
//! primary key, `Limit` bounds the number of items *evaluated* per page (before
//! the filter), and `LastEvaluatedKey` is returned whenever more items remain.
//!
//! # Architecture
//!
//! ```text
//! DashMap<TableName, Arc<MemoryTable>>
//! MemoryTable = RwLock<BTreeMap<StoredKey, Item>>
//! ```
//!
//! A single ordered map per table gives a deterministic scan order and lets a
//! cursor resume with a range lookup.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dynafilter_model::attribute_value::lookup_path;
use dynafilter_model::output::PageOutput;
use dynafilter_model::{AttributeValue, BackendError, Item, Key};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::backend::{Backend, QueryRequest, ScanRequest};
use crate::error::eval_error_to_backend;
use crate::expression::ast::{CompareOp, Expr};
use crate::expression::{EvalContext, parse_number};
use crate::planner::KeySchema;

/// Items evaluated per page when a request sets no `Limit`.
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// Primary key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKeys {
    /// Partition (HASH) key name.
    pub partition_key: String,
    /// Optional sort (RANGE) key name.
    pub sort_key: Option<String>,
}

impl TableKeys {
    /// A table keyed by partition key only.
    #[must_use]
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// The planner's view of these keys.
    #[must_use]
    pub fn key_schema(&self) -> KeySchema {
        KeySchema::new(
            std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref()),
        )
    }

    fn is_key_attribute(&self, name: &str) -> bool {
        name == self.partition_key || self.sort_key.as_deref() == Some(name)
    }

    fn stored_key(&self, item: &Item) -> Result<StoredKey, BackendError> {
        let partition = SortableValue::from_key_attribute(&self.partition_key, item)?;
        let sort = self
            .sort_key
            .as_deref()
            .map(|name| SortableValue::from_key_attribute(name, item))
            .transpose()?;
        Ok(StoredKey { partition, sort })
    }

    fn key_of(&self, item: &Item) -> Key {
        item.iter()
            .filter(|(name, _)| self.is_key_attribute(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// A key attribute value with DynamoDB ordering.
#[derive(Debug, Clone)]
enum SortableValue {
    S(String),
    N(Decimal),
    B(bytes::Bytes),
}

impl SortableValue {
    fn from_key_attribute(name: &str, item: &Item) -> Result<Self, BackendError> {
        match item.get(name) {
            Some(AttributeValue::S(s)) => Ok(Self::S(s.clone())),
            Some(AttributeValue::N(n)) => parse_number(n).map(Self::N).ok_or_else(|| {
                BackendError::validation(format!(
                    "The parameter cannot be converted to a numeric value: {n}"
                ))
            }),
            Some(AttributeValue::B(b)) => Ok(Self::B(b.clone())),
            Some(other) => Err(BackendError::validation(format!(
                "One or more parameter values were invalid: key attribute '{name}' has type {}",
                other.type_descriptor()
            ))),
            None => Err(BackendError::validation(format!(
                "One or more parameter values were invalid: missing key attribute '{name}'"
            ))),
        }
    }
}

impl PartialEq for SortableValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableValue {}

impl PartialOrd for SortableValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => a.cmp(b),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::S(_), _) => Ordering::Less,
            (_, Self::S(_)) => Ordering::Greater,
            (Self::N(_), _) => Ordering::Less,
            (_, Self::N(_)) => Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoredKey {
    partition: SortableValue,
    sort: Option<SortableValue>,
}

// ---------------------------------------------------------------------------
// MemoryTable
// ---------------------------------------------------------------------------

/// One table's items, ordered by primary key.
#[derive(Debug)]
pub struct MemoryTable {
    keys: TableKeys,
    items: RwLock<BTreeMap<StoredKey, Item>>,
}

impl MemoryTable {
    fn new(keys: TableKeys) -> Self {
        Self {
            keys,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// The table's primary key attributes.
    #[must_use]
    pub fn keys(&self) -> &TableKeys {
        &self.keys
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the table holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Insert or replace an item.
    ///
    /// # Errors
    ///
    /// `ValidationException` if a key attribute is missing or not S, N or B.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, BackendError> {
        let key = self.keys.stored_key(&item)?;
        Ok(self.items.write().insert(key, item))
    }

    fn read_page(&self, page: &PageRequest<'_>) -> Result<PageOutput, BackendError> {
        let start = match page.exclusive_start_key {
            Some(cursor) => Bound::Excluded(self.keys.stored_key(cursor).map_err(|_| {
                BackendError::validation("The provided starting key is invalid")
            })?),
            None => Bound::Unbounded,
        };
        let limit = page.limit;

        let items = self.items.read();
        let mut evaluated = 0_usize;
        let mut last_evaluated: Option<&Item> = None;
        let mut has_more = false;
        let mut matched = Vec::new();

        for (_, item) in items.range((start, Bound::Unbounded)) {
            let ctx = EvalContext {
                item,
                names: page.names,
                values: page.values,
            };
            if let Some(key_condition) = page.key_condition {
                if !ctx.evaluate(key_condition).map_err(eval_error_to_backend)? {
                    continue;
                }
            }
            if evaluated == limit {
                has_more = true;
                break;
            }
            evaluated += 1;
            last_evaluated = Some(item);

            let keep = match page.filter {
                Some(filter) => ctx.evaluate(filter).map_err(eval_error_to_backend)?,
                None => true,
            };
            if keep {
                matched.push(match &page.projection {
                    Some(paths) => project(item, paths),
                    None => item.clone(),
                });
            }
        }

        let cursor = if has_more {
            last_evaluated.map(|item| self.keys.key_of(item))
        } else {
            None
        };
        let mut output = PageOutput::new(matched, cursor);
        output.scanned_count = i32::try_from(evaluated).unwrap_or(i32::MAX);
        Ok(output)
    }
}

/// Parameters shared by `Query` and `Scan` pages.
struct PageRequest<'a> {
    key_condition: Option<&'a Expr>,
    filter: Option<&'a Expr>,
    names: &'a BTreeMap<String, String>,
    values: &'a BTreeMap<String, AttributeValue>,
    projection: Option<Vec<String>>,
    limit: usize,
    exclusive_start_key: Option<&'a Key>,
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// A [`Backend`] holding every table in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    tables: DashMap<String, Arc<MemoryTable>>,
    page_size: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set how many items a page evaluates when a request sets no `Limit`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create a table.
    ///
    /// # Errors
    ///
    /// `ResourceInUseException` if the table already exists.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        keys: TableKeys,
    ) -> Result<Arc<MemoryTable>, BackendError> {
        match self.tables.entry(name.into()) {
            Entry::Occupied(e) => Err(BackendError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => {
                let table = Arc::new(MemoryTable::new(keys));
                e.insert(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    /// Get a table or return `ResourceNotFoundException`.
    ///
    /// # Errors
    ///
    /// `ResourceNotFoundException` if the table does not exist.
    pub fn require_table(&self, name: &str) -> Result<Arc<MemoryTable>, BackendError> {
        self.tables
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| {
                BackendError::resource_not_found(format!(
                    "Requested resource not found: Table: {name} not found"
                ))
            })
    }

    /// Insert or replace an item in `table`.
    ///
    /// # Errors
    ///
    /// `ResourceNotFoundException` for an unknown table, `ValidationException`
    /// for an item without valid key attributes.
    pub fn put_item(&self, table: &str, item: Item) -> Result<(), BackendError> {
        self.require_table(table)?.put_item(item)?;
        Ok(())
    }

    fn page_limit(&self, limit: Option<i32>) -> Result<usize, BackendError> {
        match limit {
            None => Ok(self.page_size),
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| BackendError::validation("Limit must be greater than 0")),
        }
    }
}

impl Backend for MemoryBackend {
    fn query(&self, request: &QueryRequest) -> Result<PageOutput, BackendError> {
        let table = self.require_table(&request.table_name)?;
        validate_key_condition(
            &request.key_condition,
            &request.attribute_names,
            table.keys(),
        )?;

        let page = PageRequest {
            key_condition: Some(&request.key_condition),
            filter: request.filter.as_ref(),
            names: &request.attribute_names,
            values: &request.attribute_values,
            projection: parse_projection(request.projection.as_deref(), &request.attribute_names)?,
            limit: self.page_limit(request.limit)?,
            exclusive_start_key: request.exclusive_start_key.as_ref(),
        };
        let output = table.read_page(&page)?;
        debug!(
            table = %request.table_name,
            count = output.count,
            scanned = output.scanned_count,
            more = output.last_evaluated_key.is_some(),
            "served query page"
        );
        Ok(output)
    }

    fn scan(&self, request: &ScanRequest) -> Result<PageOutput, BackendError> {
        let table = self.require_table(&request.table_name)?;

        let page = PageRequest {
            key_condition: None,
            filter: request.filter.as_ref(),
            names: &request.attribute_names,
            values: &request.attribute_values,
            projection: parse_projection(request.projection.as_deref(), &request.attribute_names)?,
            limit: self.page_limit(request.limit)?,
            exclusive_start_key: request.exclusive_start_key.as_ref(),
        };
        let output = table.read_page(&page)?;
        debug!(
            table = %request.table_name,
            count = output.count,
            scanned = output.scanned_count,
            more = output.last_evaluated_key.is_some(),
            "served scan page"
        );
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Reject key conditions DynamoDB would reject: a disjunction, a non-key
/// attribute, or no equality on the partition key.
fn validate_key_condition(
    expr: &Expr,
    names: &BTreeMap<String, String>,
    keys: &TableKeys,
) -> Result<(), BackendError> {
    if expr.has_disjunction() {
        return Err(BackendError::validation(
            "Invalid operator used in KeyConditionExpression: OR",
        ));
    }

    let mut partition_eq = false;
    for leaf in expr.leaves() {
        let Some(attribute) = leaf.attribute() else {
            continue;
        };
        let placeholder = attribute.placeholder();
        let name = names.get(&placeholder).ok_or_else(|| {
            BackendError::validation(format!(
                "An expression attribute name used in the document path is not defined; \
                 attribute name: {placeholder}"
            ))
        })?;
        if !keys.is_key_attribute(name) {
            return Err(BackendError::validation(format!(
                "Query condition references non-key attribute: {name}"
            )));
        }
        if *name == keys.partition_key {
            if !matches!(leaf, Expr::Compare { op: CompareOp::Eq, .. }) {
                return Err(BackendError::validation(
                    "Query key condition not supported",
                ));
            }
            partition_eq = true;
        }
    }

    if partition_eq {
        Ok(())
    } else {
        Err(BackendError::validation(format!(
            "Query condition missed key schema element: {}",
            keys.partition_key
        )))
    }
}

/// Split a projection expression into attribute paths, resolving `#name`
/// placeholders.
fn parse_projection(
    projection: Option<&str>,
    names: &BTreeMap<String, String>,
) -> Result<Option<Vec<String>>, BackendError> {
    let Some(projection) = projection else {
        return Ok(None);
    };
    projection
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('#') {
                names.get(p).cloned().ok_or_else(|| {
                    BackendError::validation(format!(
                        "Value provided in ExpressionAttributeNames unused in expressions: {p}"
                    ))
                })
            } else {
                Ok(p.to_owned())
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn project(item: &Item, paths: &[String]) -> Item {
    let mut out = Item::new();
    for path in paths {
        if let Some(value) = item.get(path) {
            out.insert(path.clone(), value.clone());
        } else if let Some(value) = lookup_path(item, path) {
            let segments: Vec<&str> = path.split('.').collect();
            insert_nested(&mut out, &segments, value.clone());
        }
    }
    out
}

fn insert_nested(target: &mut HashMap<String, AttributeValue>, segments: &[&str], value: AttributeValue) {
    match segments {
        [] => {}
        [last] => {
            target.insert((*last).to_owned(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry((*head).to_owned())
                .or_insert_with(|| AttributeValue::M(HashMap::new()));
            if let AttributeValue::M(inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}
