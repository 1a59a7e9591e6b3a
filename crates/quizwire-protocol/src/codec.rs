//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and raw bytes. The rest of the
//! stack doesn't care how — readers and writers just need something
//! that implements [`Codec`], so the format can change without touching
//! the connection plumbing.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs are held by long-lived Tokio
/// tasks that may run on any worker thread. `decode` takes
/// `DeserializeOwned` so the result owns its data and the input buffer
/// can be dropped immediately.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Human-readable on the wire, which makes sessions easy to debug with
/// nothing more than tcpdump. Behind the `json` feature flag (enabled
/// by default) so a binary codec could replace it wholesale.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// =========================================================================
// Tests
// =========================================================================
