//! The backend collaborator: anything that can serve DynamoDB `Query` and
//! `Scan` pages.
//!
//! Requests carry compiled predicate trees rather than expression text, so an
//! adapter can either evaluate them directly (as [`crate::memory::MemoryBackend`]
//! does) or render them to the JSON protocol with `to_input`.

use std::collections::BTreeMap;
use std::sync::Arc;

use dynafilter_model::input::{QueryInput, ScanInput};
use dynafilter_model::output::PageOutput;
use dynafilter_model::{AttributeValue, BackendError, BackendOperation, Key};

use crate::expression::{CompiledQuery, Expr};

/// A store exposing paginated `Query` and `Scan`.
///
/// Implementations own transport, retries and consistency; every failure is
/// returned as a [`BackendError`] and passed through to the caller unchanged.
pub trait Backend: Send + Sync {
    /// Fetch one page of an indexed lookup.
    ///
    /// # Errors
    ///
    /// Any failure reported by the store.
    fn query(&self, request: &QueryRequest) -> Result<PageOutput, BackendError>;

    /// Fetch one page of a full-table pass.
    ///
    /// # Errors
    ///
    /// Any failure reported by the store.
    fn scan(&self, request: &ScanRequest) -> Result<PageOutput, BackendError>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn query(&self, request: &QueryRequest) -> Result<PageOutput, BackendError> {
        (**self).query(request)
    }

    fn scan(&self, request: &ScanRequest) -> Result<PageOutput, BackendError> {
        (**self).scan(request)
    }
}

/// One `Query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// The table to query.
    pub table_name: String,
    /// Key-condition tree.
    pub key_condition: Expr,
    /// Filter tree.
    pub filter: Option<Expr>,
    /// `#alias` to attribute name or path.
    pub attribute_names: BTreeMap<String, String>,
    /// `:alias` to value.
    pub attribute_values: BTreeMap<String, AttributeValue>,
    /// Projection expression.
    pub projection: Option<String>,
    /// Per-call page size.
    pub limit: Option<i32>,
    /// Strongly consistent read.
    pub consistent_read: bool,
    /// Cursor from the previous page.
    pub exclusive_start_key: Option<Key>,
}

impl QueryRequest {
    /// Render as a DynamoDB JSON protocol request body.
    #[must_use]
    pub fn to_input(&self) -> QueryInput {
        QueryInput {
            table_name: self.table_name.clone(),
            key_condition_expression: self.key_condition.to_string(),
            filter_expression: self.filter.as_ref().map(ToString::to_string),
            projection_expression: self.projection.clone(),
            expression_attribute_names: self.attribute_names.clone(),
            expression_attribute_values: self.attribute_values.clone(),
            limit: self.limit,
            consistent_read: self.consistent_read.then_some(true),
            exclusive_start_key: self.exclusive_start_key.clone(),
        }
    }
}

/// One `Scan` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// The table to scan.
    pub table_name: String,
    /// Filter tree; `None` returns every item.
    pub filter: Option<Expr>,
    /// `#alias` to attribute name or path.
    pub attribute_names: BTreeMap<String, String>,
    /// `:alias` to value.
    pub attribute_values: BTreeMap<String, AttributeValue>,
    /// Projection expression.
    pub projection: Option<String>,
    /// Per-call page size.
    pub limit: Option<i32>,
    /// Strongly consistent read.
    pub consistent_read: bool,
    /// Cursor from the previous page.
    pub exclusive_start_key: Option<Key>,
}

impl ScanRequest {
    /// Render as a DynamoDB JSON protocol request body.
    #[must_use]
    pub fn to_input(&self) -> ScanInput {
        ScanInput {
            table_name: self.table_name.clone(),
            filter_expression: self.filter.as_ref().map(ToString::to_string),
            projection_expression: self.projection.clone(),
            expression_attribute_names: self.attribute_names.clone(),
            expression_attribute_values: self.attribute_values.clone(),
            limit: self.limit,
            consistent_read: self.consistent_read.then_some(true),
            exclusive_start_key: self.exclusive_start_key.clone(),
        }
    }
}

/// Read options applied to every page of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Per-call page size.
    pub limit: Option<i32>,
    /// Strongly consistent read.
    pub consistent_read: bool,
}

/// A ready-to-send `Query` or `Scan`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    /// Indexed lookup.
    Query(QueryRequest),
    /// Full-table pass.
    Scan(ScanRequest),
}

impl BackendRequest {
    /// Choose the operation for a compiled query: `Query` when a key
    /// expression exists, otherwise `Scan`.
    #[must_use]
    pub fn from_compiled(table_name: &str, compiled: CompiledQuery, options: ReadOptions) -> Self {
        let CompiledQuery {
            key_expression,
            filter_expression,
            exact_filter: _,
            attribute_names,
            attribute_values,
            projection,
        } = compiled;

        match key_expression {
            Some(key_condition) => Self::Query(QueryRequest {
                table_name: table_name.to_owned(),
                key_condition,
                filter: filter_expression,
                attribute_names,
                attribute_values,
                projection,
                limit: options.limit,
                consistent_read: options.consistent_read,
                exclusive_start_key: None,
            }),
            None => Self::Scan(ScanRequest {
                table_name: table_name.to_owned(),
                filter: filter_expression,
                attribute_names,
                attribute_values,
                projection,
                limit: options.limit,
                consistent_read: options.consistent_read,
                exclusive_start_key: None,
            }),
        }
    }

    /// The operation this request issues.
    #[must_use]
    pub fn operation(&self) -> BackendOperation {
        match self {
            Self::Query(_) => BackendOperation::Query,
            Self::Scan(_) => BackendOperation::Scan,
        }
    }

    /// The target table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Query(q) => &q.table_name,
            Self::Scan(s) => &s.table_name,
        }
    }

    /// The request body as JSON protocol text.
    ///
    /// # Errors
    ///
    /// A serialization failure from `serde_json`.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Query(q) => serde_json::to_value(q.to_input()),
            Self::Scan(s) => serde_json::to_value(s.to_input()),
        }
    }

    /// Issue this request with `cursor` as the exclusive start key, leaving
    /// every other parameter untouched.
    ///
    /// # Errors
    ///
    /// Whatever the backend returns.
    pub fn send<B: Backend + ?Sized>(
        &self,
        backend: &B,
        cursor: Option<Key>,
    ) -> Result<PageOutput, BackendError> {
        match self {
            Self::Query(q) => {
                let request = QueryRequest {
                    exclusive_start_key: cursor,
                    ..q.clone()
                };
                backend.query(&request)
            }
            Self::Scan(s) => {
                let request = ScanRequest {
                    exclusive_start_key: cursor,
                    ..s.clone()
                };
                backend.scan(&request)
            }
        }
    }
}
