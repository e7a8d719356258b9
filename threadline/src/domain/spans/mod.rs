//! Span input model.
//!
//! [`SpanNode`] is the read-only input record for conversation
//! reconstruction: an identifier, a start timestamp, a status summary, and a
//! string-keyed attribute bag. Spans usually arrive via the OTLP adapter in
//! [`otlp`], but any collaborator that can fill these fields may construct
//! them directly.
//!
//! Attribute values are stored as strings (compound OTLP values are
//! serialized to JSON text on ingest). [`AttributeMap`] provides typed,
//! optional lookups over that bag; no accessor ever fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

pub mod otlp;

// ============================================================================
// SPAN STATUS
// ============================================================================

/// Recorded outcome of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanStatus {
    /// No explicit status was recorded.
    #[default]
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation was recorded as failed.
    Error,
}

// ============================================================================
// SPAN NODE
// ============================================================================

/// A single trace record consumed by the reconstruction pipeline.
///
/// Spans are read-only input: the pipeline never mutates them and holds them
/// only by reference while deriving turns.
#[derive(Debug, Clone, Default)]
pub struct SpanNode {
    /// Unique span identifier (hex-encoded when built from OTLP).
    pub span_id: String,
    /// Start timestamp. A missing OTLP start time maps to the Unix epoch.
    pub start: DateTime<Utc>,
    /// Recorded span status.
    pub status: SpanStatus,
    /// Number of explicitly recorded errors (OTLP `exception` events).
    pub error_count: u32,
    /// Attribute bag.
    pub attributes: AttributeMap,
}

impl SpanNode {
    /// Create a span with an empty attribute bag and `Unset` status.
    pub fn new(span_id: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            span_id: span_id.into(),
            start,
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Set the recorded status.
    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }
}

// ============================================================================
// ATTRIBUTE MAP
// ============================================================================

/// String-keyed attribute bag with typed, optional lookups.
///
/// Call sites declare the specific keys they read; every accessor returns
/// `Option` so that absent or mistyped values degrade to "no value" rather
/// than an error.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    map: HashMap<String, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    /// Raw string lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// First matching value from a list of keys, in declaration order.
    pub fn get_first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Parse a value as `i64`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Parse a value as JSON.
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|s| serde_json::from_str(s).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert every entry of `defaults` whose key is not already present.
    ///
    /// Used on OTLP ingest to let span-level attributes shadow resource-level
    /// ones.
    pub fn merge_defaults(&mut self, defaults: &AttributeMap) {
        for (key, value) in &defaults.map {
            self.map
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
