//! The OData-style response envelope.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::attribute_value::Item;

/// The final result of a filter query.
///
/// Serialises as `{"d": {"__count": N, "results": [...]}}` with every item
/// rendered as a plain JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultEnvelope {
    /// Number of items in `results`.
    pub count: usize,
    /// Items in arrival order.
    pub results: Vec<Item>,
}

impl ResultEnvelope {
    /// Wrap `results`, deriving `count` from their length.
    #[must_use]
    pub fn new(results: Vec<Item>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(1))?;
        outer.serialize_entry("d", &Body(self))?;
        outer.end()
    }
}

struct Body<'a>(&'a ResultEnvelope);

impl Serialize for Body<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let results: Vec<serde_json::Map<String, serde_json::Value>> = self
            .0
            .results
            .iter()
            .map(|item| {
                item.iter()
                    .map(|(name, value)| (name.clone(), value.to_document()))
                    .collect()
            })
            .collect();

        let mut body = serializer.serialize_map(Some(2))?;
        body.serialize_entry("__count", &self.0.count)?;
        body.serialize_entry("results", &results)?;
        body.end()
    }
}
