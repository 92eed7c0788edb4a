//! Thought records and the collection file they live in
//!
//! The collection is a JSON array, newest first, stored base64-encoded by the
//! content API. Records written by other tools may carry fields we do not
//! know about; those ride along in `extra` so a rewrite never drops them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::TinymindError;

/// A single user-authored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// Creation time in epoch milliseconds, as a string
    pub id: String,
    pub content: String,
    /// RFC 3339 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
    pub date: String,
    /// Login name of the writer
    pub author: String,
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Thought {
    /// Build a record stamped with `now`. Id and date come from the same reading.
    pub fn new(content: impl Into<String>, author: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: now.timestamp_millis().to_string(),
            content: content.into(),
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            author: author.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Ordered, newest-first list of thoughts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThoughtCollection(Vec<Thought>);

impl ThoughtCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a new record in front; existing entries keep their relative order.
    pub fn prepend(&mut self, thought: Thought) {
        self.0.insert(0, thought);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Thought> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Thought> {
        self.0.first()
    }

    pub fn into_vec(self) -> Vec<Thought> {
        self.0
    }

    /// Decode file content as returned by the content API.
    ///
    /// GitHub wraps base64 at 60 columns, so whitespace is stripped first.
    pub fn from_base64(encoded: &str) -> Result<Self, TinymindError> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let raw = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| TinymindError::CorruptStoreFailed(format!("invalid base64: {}", e)))?;

        serde_json::from_slice(&raw)
            .map_err(|e| TinymindError::CorruptStoreFailed(format!("invalid thoughts JSON: {}", e)))
    }

    /// Encode the whole collection for a content API write.
    pub fn to_base64(&self) -> Result<String, TinymindError> {
        let json = serde_json::to_string_pretty(&self.0)
            .map_err(|e| TinymindError::RemoteWriteFailed(format!("failed to serialize thoughts: {}", e)))?;
        Ok(STANDARD.encode(json.as_bytes()))
    }
}

impl From<Vec<Thought>> for ThoughtCollection {
    fn from(thoughts: Vec<Thought>) -> Self {
        Self(thoughts)
    }
}

impl IntoIterator for ThoughtCollection {
    type Item = Thought;
    type IntoIter = std::vec::IntoIter<Thought>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
