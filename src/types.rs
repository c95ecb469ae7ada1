//! Core types for the inventory engine.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Category assigned to items stored without one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Unique key of an item within the collection.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(key: impl Into<String>) -> Self {
        ItemId(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// Version of a published mirror snapshot. Zero is the empty initial snapshot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SnapshotVersion(pub u64);

impl fmt::Debug for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ver({})", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. Clocks before the epoch read as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A single inventory item as seen in the mirror.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Collection key (store-allocated, or the normalized name).
    pub id: ItemId,

    /// Display name, never blank.
    pub name: String,

    /// Display category, never blank.
    pub category: String,

    pub quantity: u64,

    /// Opaque encoded image payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Form values for adding or editing an item.
///
/// `editing` names the item being edited; `None` means the draft creates a
/// new item when saved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub editing: Option<ItemId>,
    pub name: String,
    pub category: String,
    pub quantity: u64,
    pub image: Option<String>,
}

impl ItemDraft {
    /// Draft for a new item.
    pub fn new(name: impl Into<String>, category: impl Into<String>, quantity: u64) -> Self {
        Self {
            editing: None,
            name: name.into(),
            category: category.into(),
            quantity,
            image: None,
        }
    }

    /// Draft pre-filled from an existing record, targeting it for edit.
    pub fn from_record(record: &ItemRecord) -> Self {
        Self {
            editing: Some(record.id.clone()),
            name: record.name.clone(),
            category: record.category.clone(),
            quantity: record.quantity,
            image: record.image.clone(),
        }
    }

    /// Target an existing item.
    pub fn editing(mut self, id: impl Into<ItemId>) -> Self {
        self.editing = Some(id.into());
        self
    }

    /// Attach an image payload.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Parse the text of a quantity field.
    pub fn parse_quantity(input: &str) -> EngineResult<u64> {
        let trimmed = input.trim();
        trimmed.parse::<u64>().map_err(|_| {
            EngineError::Validation(format!(
                "Quantity must be a non-negative integer: {:?}",
                trimmed
            ))
        })
    }

    /// Check the draft and normalize its text fields.
    ///
    /// Blank names are rejected; a blank category becomes `default_category`.
    pub fn validate(&self, default_category: &str) -> EngineResult<ValidDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("Item name must not be blank".into()));
        }

        let category = match self.category.trim() {
            "" => default_category.to_string(),
            c => c.to_string(),
        };

        Ok(ValidDraft {
            editing: self.editing.clone(),
            name: name.to_string(),
            category,
            quantity: self.quantity,
            image: self.image.clone(),
        })
    }
}

/// A draft that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDraft {
    pub editing: Option<ItemId>,
    pub name: String,
    pub category: String,
    pub quantity: u64,
    pub image: Option<String>,
}

/// Key used for an item in the keyed-by-name layout.
///
/// Trims, lower-cases and collapses inner whitespace runs to a single space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
