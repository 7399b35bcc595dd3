//! Record payload codecs.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::format::Format;

/// Converts records to and from stored payloads.
///
/// Decoding a zero-length payload is not an error: [`decode_into`]
/// leaves the target as it was. Raw values written with
/// [`Db::save_value`](crate::Db::save_value) may be empty, and listing them
/// as records yields default values instead of failing.
///
/// [`decode_into`]: Codec::decode_into
pub trait Codec: Send + Sync {
    /// The wire format this codec produces.
    fn format(&self) -> Format;

    /// Serialize `value`.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a non-empty payload.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Deserialize `bytes` over `target`. Empty input is a no-op.
    fn decode_into<T: DeserializeOwned>(&self, bytes: &[u8], target: &mut T) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        *target = self.decode(bytes)?;
        Ok(())
    }
}

/// A codec that stores records as JSON.
///
/// This is the default codec.
///
/// # Example
///
/// ```rust
/// use shelf_mapper::{Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(bytes, b"[1,2,3]");
///
/// let mut target: Vec<i32> = vec![9];
/// codec.decode_into(b"", &mut target).unwrap();
/// assert_eq!(target, vec![9]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::JSON
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Encode {
            format: self.format(),
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode {
            format: self.format(),
            message: e.to_string(),
        })
    }
}
