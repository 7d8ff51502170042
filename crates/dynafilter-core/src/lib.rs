//! DynaFilter core: OData-style filter strings to DynamoDB reads.
//!
//! A request flows through the pipeline in strict sequence:
//!
//! 1. [`parser`] turns the filter string into an ordered [`ConditionList`].
//! 2. [`planner`] splits it into key and filter buckets using the table's
//!    [`KeySchema`].
//! 3. [`expression::compiler`] builds predicate trees plus attribute aliases.
//! 4. [`collector`] drives `Query`/`Scan` pages until no cursor remains, or
//!    stops after the first page when asked to.
//! 5. [`post_filter`] restores exact semantics the backend could only
//!    approximate.
//!
//! [`FilterQueryService`] wires the stages together.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod backend;
pub mod collector;
pub mod condition;
pub mod config;
pub mod error;
pub mod expression;
pub mod memory;
pub mod parser;
pub mod planner;
pub mod post_filter;
pub mod service;

pub use backend::{Backend, BackendRequest, QueryRequest, ReadOptions, ScanRequest};
pub use condition::{Condition, ConditionList, Connector, Literal, Operator, TypedValue};
pub use config::{ConfigError, DynaFilterConfig, KeySchemaRegistry};
pub use error::{ParseError, QueryError, QueryResult, ValidationError};
pub use expression::CompiledQuery;
pub use memory::{MemoryBackend, TableKeys};
pub use parser::parse_filter;
pub use planner::{KeySchema, QueryPlan, plan, plan_scan};
pub use post_filter::PostFilter;
pub use service::{FilterQueryService, PreparedQuery};
