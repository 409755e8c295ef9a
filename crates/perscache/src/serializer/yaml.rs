use serde::{de::DeserializeOwned, Serialize};

use super::Serializer;
use crate::{CacheError, Result};

const FORMAT_ID: &str = "YamlSerializer";

/// Human-readable YAML format
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl YamlSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl<T> Serializer<T> for YamlSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn extension(&self) -> &str {
        "yaml"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| CacheError::serialization(FORMAT_ID, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_yaml::from_slice(bytes).map_err(|e| CacheError::deserialization(FORMAT_ID, e))
    }
}
