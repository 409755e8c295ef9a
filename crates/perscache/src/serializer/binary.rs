use serde::{de::DeserializeOwned, Serialize};

use super::Serializer;
use crate::{CacheError, Result};

const FORMAT_ID: &str = "BincodeSerializer";

/// Compact binary format; the default for cached functions
///
/// Handles any serde type whose representation is self-describing through
/// its Rust type (structs, enums, tuples, sets, timestamps). Types that need
/// `deserialize_any`, such as `serde_json::Value`, belong with
/// [`JsonSerializer`](super::JsonSerializer) instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl BincodeSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl<T> Serializer<T> for BincodeSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn extension(&self) -> &str {
        "bin"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::serialization(FORMAT_ID, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        let (value, consumed) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CacheError::deserialization(FORMAT_ID, e))?;

        if consumed != bytes.len() {
            return Err(CacheError::deserialization(
                FORMAT_ID,
                format!("{} trailing bytes after value", bytes.len() - consumed),
            ));
        }

        Ok(value)
    }
}
