//! The GM-defined character-sheet schema.
//!
//! A schema is an ordered list of sections; each section holds an ordered
//! list of fields. The schema is stored on the table row as a JSON array and
//! is always valid — an empty table starts with `[]`.
//!
//! Field *values* live on the player row keyed by field name
//! (see [`crate::values`]); removing a field from the schema does not purge
//! values already saved under that name.

use serde::{Deserialize, Serialize};

/// The full sheet schema of a table.
pub type SheetSchema = Vec<SchemaSection>;

/// One section of the character sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSection {
    /// Client-assigned section id, used for list keys in the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Section heading shown above its fields.
    #[serde(default)]
    pub title: String,
    /// Ordered fields within the section.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// One field of the character sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    /// Field name — also the key under which values are saved in sheet data.
    pub name: String,
    /// Input shape for the field.
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

/// The closed set of field input shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Numeric input.
    Number,
    /// Multi-line text area.
    Longtext,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
