use serde::{de::DeserializeOwned, Serialize};

use super::Serializer;
use crate::{CacheError, Result};

const FORMAT_ID: &str = "JsonSerializer";

/// Human-readable JSON format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl<T> Serializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::serialization(FORMAT_ID, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::deserialization(FORMAT_ID, e))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;

    #[test]
    fn test_json_roundtrip_map() {
        let serializer = JsonSerializer::new();
        let value: BTreeMap<String, i64> = [("a".to_string(), 1), ("b".to_string(), 2)].into();
        let bytes = serializer.encode(&value).unwrap();
        let decoded: BTreeMap<String, i64> = serializer.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_json_rejects_non_string_map_keys() {
        let serializer = JsonSerializer::new();
        let value: HashMap<(i32, i32), i32> = [((1, 2), 3)].into();
        let err = Serializer::<HashMap<(i32, i32), i32>>::encode(&serializer, &value).unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
    }

    #[test]
    fn test_json_malformed_input() {
        let serializer = JsonSerializer::new();
        let err = Serializer::<Vec<i32>>::decode(&serializer, b"[1, 2").unwrap_err();
        assert!(matches!(err, CacheError::Deserialization { .. }));
    }
}
