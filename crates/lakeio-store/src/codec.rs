//! Object encoding
//!
//! Metadata values are plain serde types; the codec decides the bytes that
//! reach the store. Bincode is the compact default; JSON is readable and is
//! what the admin tooling prints.

use bytes::Bytes;
use lakeio_common::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialization format for stored objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Codec {
    #[default]
    Bincode,
    Json,
}

impl Codec {
    /// Encode a value
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Bytes> {
        let bytes = match self {
            Self::Bincode => {
                bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))?
            }
            Self::Json => {
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?
            }
        };
        Ok(Bytes::from(bytes))
    }

    /// Decode a value
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Bincode => {
                bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
            }
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
            }
        }
    }

    /// Pretty JSON rendering for humans, independent of the storage codec
    pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakeio_common::{Column, RowsetMetadata, SchemaDescriptor, TabletMetadata};

    fn sample() -> TabletMetadata {
        let mut metadata = TabletMetadata::new(42, 3);
        metadata.schema = SchemaDescriptor::with_columns(
            10,
            vec![Column::new(0, "c0", "BIGINT").key(), Column::new(1, "c1", "INT").nullable()],
        );
        metadata.rowsets.push(RowsetMetadata::new(2, 5, 1024));
        metadata.commit_time = Some(1_700_000_000);
        metadata
    }

    #[test]
    fn test_codecs_preserve_metadata() {
        let metadata = sample();
        for codec in [Codec::Bincode, Codec::Json] {
            let bytes = codec.encode(&metadata).unwrap();
            let back: TabletMetadata = codec.decode(&bytes).unwrap();
            assert_eq!(back, metadata, "{codec:?}");
        }
    }

    #[test]
    fn test_decode_garbage() {
        let err = Codec::Bincode.decode::<TabletMetadata>(b"\x01").unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
        let err = Codec::Json.decode::<TabletMetadata>(b"{").unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_json_pretty_uses_type_field() {
        let json = Codec::to_json_pretty(&sample()).unwrap();
        assert!(json.contains("\"type\": \"BIGINT\""));
    }
}
