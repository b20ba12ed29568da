//! Serialization boundaries.
//!
//! Two codecs live here:
//! - the snapshot codec, turning a [`SnapshotImage`] into a transportable
//!   string (CBOR, then URL-safe base64 without padding) and back;
//! - the document codec, turning a typed document into the JSON text stored
//!   in a table's `data` column and back.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Snapshot layout version. Bumped only when [`SnapshotImage`] itself changes
/// shape; schema changes are tracked by `schema_version`.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Logical export of every table in the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub format: u32,
    pub schema_version: u32,
    pub tables: Vec<TableImage>,
}

/// All rows of one table, in primary-key order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableImage {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// A single SQLite value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SnapshotImage {
    /// Rows of the named table, if it was exported.
    pub fn table(&self, name: &str) -> Option<&TableImage> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Encode a snapshot image into its transport string.
pub fn encode(image: &SnapshotImage) -> Result<String> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(image, &mut bytes)
        .map_err(|e| StoreError::Codec(format!("cbor encode: {e}")))?;
    Ok(base64::Engine::encode(&URL_SAFE_NO_PAD, &bytes))
}

/// Decode a transport string back into a snapshot image.
pub fn decode(blob: &str) -> Result<SnapshotImage> {
    let bytes = base64::Engine::decode(&URL_SAFE_NO_PAD, blob.trim())
        .map_err(|e| StoreError::Codec(format!("invalid base64: {e}")))?;

    let image: SnapshotImage = ciborium::de::from_reader(bytes.as_slice())
        .map_err(|e| StoreError::Codec(format!("invalid snapshot: {e}")))?;

    if image.format != SNAPSHOT_FORMAT {
        return Err(StoreError::Codec(format!(
            "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT})",
            image.format
        )));
    }

    Ok(image)
}

/// Serialize a document for a `data` column.
pub fn encode_document<T: Serialize + ?Sized>(document: &T) -> Result<String> {
    serde_json::to_string(document).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserialize a document read from a `data` column.
pub fn decode_document<T: DeserializeOwned>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SnapshotImage {
        SnapshotImage {
            format: SNAPSHOT_FORMAT,
            schema_version: 1,
            tables: vec![TableImage {
                name: "posts".into(),
                columns: vec!["id".into(), "data".into(), "timestamp".into()],
                rows: vec![vec![
                    Cell::Text("p1".into()),
                    Cell::Text(r#"{"id":"p1"}"#.into()),
                    Cell::Integer(100),
                ]],
            }],
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let image = sample();
        let blob = encode(&image).expect("encode");
        assert_eq!(decode(&blob).expect("decode"), image);
    }

    #[test]
    fn test_transport_string_is_url_safe() {
        let blob = encode(&sample()).expect("encode");
        assert!(blob
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_equal_images_encode_identically() {
        assert_eq!(
            encode(&sample()).expect("encode"),
            encode(&sample()).expect("encode")
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not base64!!"), Err(StoreError::Codec(_))));
        let not_cbor = base64::Engine::encode(&URL_SAFE_NO_PAD, b"\xff\xff\xff");
        assert!(matches!(decode(&not_cbor), Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let mut image = sample();
        image.format = SNAPSHOT_FORMAT + 1;
        let blob = encode(&image).expect("encode");
        assert!(matches!(decode(&blob), Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_document_codec() {
        let value = serde_json::json!({"email": "a@test.com", "profile": {"name": "alice"}});
        let text = encode_document(&value).expect("encode");
        let back: serde_json::Value = decode_document(&text).expect("decode");
        assert_eq!(back, value);

        let bad: Result<serde_json::Value> = decode_document("{not json");
        assert!(matches!(bad, Err(StoreError::Serialization(_))));
    }
}
