//! Wire-level types for DynaFilter.
//!
//! This crate holds everything a backend adapter needs to speak to a
//! DynamoDB-compatible store: the tagged [`AttributeValue`], the JSON protocol
//! request and page shapes, the backend error type, and the OData-style
//! [`ResultEnvelope`] returned to callers.
// "DynamoDB" appears in most doc comments in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod envelope;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;

pub use attribute_value::{AttributeValue, Item, Key};
pub use envelope::ResultEnvelope;
pub use error::{BackendError, BackendErrorCode};
pub use operations::BackendOperation;
