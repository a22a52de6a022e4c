//! The closed value shape for dynamic, schema-less payloads.
//!
//! Sheet data and item attributes arrive from clients as free-form JSON
//! objects. Rather than passing `serde_json::Value` through the whole stack,
//! the permitted shapes are closed: a value is a string, a number, or a
//! nested string-keyed mapping of the same. Booleans, nulls, and arrays are
//! rejected at deserialization, which is the validation point — the store
//! deserializes into these types before anything is persisted or returned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single field value.
///
/// `Number` keeps the original JSON representation (`7` stays `7`, not
/// `7.0`), so stored payloads round-trip byte-compatibly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text, including embedded base64 image data.
    Text(String),
    /// Numeric value.
    Number(serde_json::Number),
    /// Nested string-keyed mapping.
    Map(BTreeMap<String, FieldValue>),
}

/// A player's filled-in sheet: field name → value.
pub type SheetData = BTreeMap<String, FieldValue>;

/// Item attributes: attribute name → value.
pub type AttrMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// The value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an `f64`, if it is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
