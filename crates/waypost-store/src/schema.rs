//! On-disk JSON shape of the record file.
//!
//! The file is meant to be hand-editable, so decoding is lenient: unknown
//! policies fall back to the default, unparsable allow-list members and
//! invalid colors are dropped, and only a structurally broken entity entry
//! causes that one record to be skipped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level file layout: entities keyed by actor UUID.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoredFile {
    /// Raw per-entity values; decoded individually so one malformed entry
    /// does not poison the rest.
    #[serde(default)]
    pub entities: IndexMap<String, Value>,
}

/// One entity's durable fields.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    /// Policy name; absent or unrecognized decodes to `expose_to_all`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Allow-list member UUIDs as strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    /// Anchor marker, if one was placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<StoredAnchor>,
    /// Display color as `#RRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Anchor fields as stored: dimension name plus integer coordinates.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredAnchor {
    /// Dimension name at save time; may no longer resolve at load time.
    pub dimension: String,
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}
