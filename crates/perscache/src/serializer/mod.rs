//! Serializer capability and bundled formats
//!
//! A serializer turns a cached value into bytes and back, under a stable
//! format identifier. The identifier takes part in key derivation, so swapping
//! serializers never reads an entry written in another format.

mod binary;
mod json;
mod table;
mod yaml;

use std::fmt;

pub use binary::BincodeSerializer;
pub use json::JsonSerializer;
pub use table::{Compression, CsvSerializer, Table};
pub use yaml::YamlSerializer;

use crate::Result;

/// Encodes and decodes values of type `T`
pub trait Serializer<T>: Send + Sync {
    /// Stable identifier folded into every cache key
    fn format_id(&self) -> &str;

    /// File extension hint used by file-based storage
    fn extension(&self) -> &str;

    /// Encode a value
    ///
    /// Fails with [`CacheError::Serialization`](crate::CacheError::Serialization)
    /// when the value cannot be represented in this format.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a value
    ///
    /// Fails with [`CacheError::Deserialization`](crate::CacheError::Deserialization)
    /// on malformed input.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

type EncodeFn<T> = dyn Fn(&T) -> Result<Vec<u8>> + Send + Sync;
type DecodeFn<T> = dyn Fn(&[u8]) -> Result<T> + Send + Sync;

/// Serializer assembled from two closures
///
/// There is nothing structural to hash here, so the caller-supplied
/// `format_id` is the serializer's whole identity: editing the closures
/// without changing the identifier keeps serving entries the old closures
/// wrote.
pub struct FnSerializer<T> {
    format_id: String,
    extension: String,
    encode: Box<EncodeFn<T>>,
    decode: Box<DecodeFn<T>>,
}

impl<T> FnSerializer<T> {
    /// Build a serializer from an encoder and a decoder
    pub fn new<E, D>(format_id: impl Into<String>, extension: impl Into<String>, encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> Result<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            format_id: format_id.into(),
            extension: extension.into(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T> fmt::Debug for FnSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSerializer")
            .field("format_id", &self.format_id)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl<T> Serializer<T> for FnSerializer<T> {
    fn format_id(&self) -> &str {
        &self.format_id
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        (self.decode)(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    fn utf8_serializer() -> FnSerializer<String> {
        FnSerializer::new(
            "Utf8Serializer",
            "txt",
            |value: &String| Ok(value.as_bytes().to_vec()),
            |bytes: &[u8]| {
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| CacheError::deserialization("Utf8Serializer", e))
            },
        )
    }

    #[test]
    fn fn_serializer_uses_supplied_identity() {
        let serializer = utf8_serializer();
        assert_eq!(serializer.format_id(), "Utf8Serializer");
        assert_eq!(serializer.extension(), "txt");
    }

    #[test]
    fn fn_serializer_roundtrip() {
        let serializer = utf8_serializer();
        let bytes = serializer.encode(&"héllo".to_string()).unwrap();
        assert_eq!(serializer.decode(&bytes).unwrap(), "héllo");
    }

    #[test]
    fn fn_serializer_decode_error_is_a_miss() {
        let serializer = utf8_serializer();
        let err = serializer.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(err.is_miss());
    }

    #[test]
    fn fn_serializer_debug_hides_closures() {
        let debug = format!("{:?}", utf8_serializer());
        assert!(debug.contains("Utf8Serializer"));
        assert!(debug.contains(".."));
    }
}
