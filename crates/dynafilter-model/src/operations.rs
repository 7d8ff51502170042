//! Backend read operations issued by the collector.

use std::fmt;

/// The two read operations a backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOperation {
    /// Indexed lookup driven by a key condition.
    Query,
    /// Unindexed pass over the whole table.
    Scan,
}

impl BackendOperation {
    /// Returns the DynamoDB operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Scan => "Scan",
        }
    }
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
