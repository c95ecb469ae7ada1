//! Conversion between stored field bags and item records.
//!
//! Documents are untrusted: every field is checked here before a record
//! reaches the mirror.

use super::adapter::{Fields, StoredDocument};
use crate::types::{ItemId, ItemRecord, ValidDraft};
use serde_json::Value;
use thiserror::Error;

pub const NAME: &str = "name";
pub const CATEGORY: &str = "category";
pub const QUANTITY: &str = "quantity";
pub const IMAGE: &str = "image";

/// Why a stored document could not be read as an item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Item name is blank")]
    BlankName,
}

/// Read a stored document as an item record.
pub fn decode(doc: &StoredDocument, default_category: &str) -> Result<ItemRecord, DocumentError> {
    let name = match doc.fields.get(NAME) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(DocumentError::BlankName),
        Some(_) => return Err(wrong_type(NAME, "a string")),
        None => return Err(DocumentError::MissingField(NAME)),
    };

    let category = match doc.fields.get(CATEGORY) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => default_category.to_string(),
        Some(_) => return Err(wrong_type(CATEGORY, "a string")),
    };

    let quantity = match doc.fields.get(QUANTITY) {
        Some(v) => as_quantity(v)?,
        None => return Err(DocumentError::MissingField(QUANTITY)),
    };

    let image = match doc.fields.get(IMAGE) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(_) => return Err(wrong_type(IMAGE, "a string")),
    };

    Ok(ItemRecord {
        id: doc.key.clone(),
        name,
        category,
        quantity,
        image,
    })
}

/// Quantity of a document for arithmetic updates. A missing quantity counts as zero.
pub fn quantity_of(doc: &StoredDocument) -> Result<u64, DocumentError> {
    match doc.fields.get(QUANTITY) {
        Some(v) => as_quantity(v),
        None => Ok(0),
    }
}

/// Fields written when saving a draft.
///
/// The image is only included when the draft carries one, so a merge leaves
/// an existing image alone.
pub fn encode_draft(draft: &ValidDraft) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.into(), Value::String(draft.name.clone()));
    fields.insert(CATEGORY.into(), Value::String(draft.category.clone()));
    fields.insert(QUANTITY.into(), Value::from(draft.quantity));
    if let Some(image) = &draft.image {
        fields.insert(IMAGE.into(), Value::String(image.clone()));
    }
    fields
}

/// Patch touching only the quantity.
pub fn quantity_patch(quantity: u64) -> Fields {
    let mut fields = Fields::new();
    fields.insert(QUANTITY.into(), Value::from(quantity));
    fields
}

/// Fields of an item first seen through an increment.
pub fn first_unit(key: &ItemId, default_category: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.into(), Value::String(key.as_str().to_string()));
    fields.insert(CATEGORY.into(), Value::String(default_category.to_string()));
    fields.insert(QUANTITY.into(), Value::from(1u64));
    fields
}

fn as_quantity(value: &Value) -> Result<u64, DocumentError> {
    value
        .as_u64()
        .ok_or_else(|| wrong_type(QUANTITY, "a non-negative integer"))
}

fn wrong_type(field: &'static str, expected: &'static str) -> DocumentError {
    DocumentError::WrongType { field, expected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::adapter::Revision;
    use crate::types::DEFAULT_CATEGORY;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> StoredDocument {
        StoredDocument {
            key: ItemId::from("k1"),
            revision: Revision(1),
            fields: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_decode_full_document() {
        let record = decode(
            &doc(json!({
                "name": "Apples",
                "category": "Produce",
                "quantity": 5,
                "image": "data:x"
            })),
            DEFAULT_CATEGORY,
        )
        .unwrap();
        assert_eq!(record.id, ItemId::from("k1"));
        assert_eq!(record.category, "Produce");
        assert_eq!(record.quantity, 5);
        assert_eq!(record.image.as_deref(), Some("data:x"));
    }

    #[test]
    fn test_decode_defaults_missing_category() {
        let record =
            decode(&doc(json!({"name": "Widget", "quantity": 1})), DEFAULT_CATEGORY).unwrap();
        assert_eq!(record.category, DEFAULT_CATEGORY);

        let record = decode(
            &doc(json!({"name": "Widget", "category": " ", "quantity": 1})),
            DEFAULT_CATEGORY,
        )
        .unwrap();
        assert_eq!(record.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_decode_rejects_bad_documents() {
        assert_eq!(
            decode(&doc(json!({"quantity": 1})), DEFAULT_CATEGORY),
            Err(DocumentError::MissingField(NAME))
        );
        assert_eq!(
            decode(&doc(json!({"name": "", "quantity": 1})), DEFAULT_CATEGORY),
            Err(DocumentError::BlankName)
        );
        assert!(decode(&doc(json!({"name": "X", "quantity": -2})), DEFAULT_CATEGORY).is_err());
        assert!(decode(&doc(json!({"name": "X", "quantity": 1.5})), DEFAULT_CATEGORY).is_err());
        assert!(decode(&doc(json!({"name": "X", "quantity": "3"})), DEFAULT_CATEGORY).is_err());
        assert!(decode(&doc(json!({"name": "X"})), DEFAULT_CATEGORY).is_err());
    }

    #[test]
    fn test_encode_draft_omits_absent_image() {
        let draft = ValidDraft {
            editing: None,
            name: "Rice".into(),
            category: "Grains".into(),
            quantity: 2,
            image: None,
        };
        let fields = encode_draft(&draft);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[QUANTITY], 2);
    }

    #[test]
    fn test_quantity_of_missing_is_zero() {
        assert_eq!(quantity_of(&doc(json!({"name": "X"}))), Ok(0));
    }
}
