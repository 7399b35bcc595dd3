//! Names for payload encodings.

use std::borrow::Cow;
use std::fmt;

/// The encoding a [`Codec`](crate::Codec) reads and writes, as a MIME type.
///
/// Encode and decode errors carry it so a failure names the wire format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format(Cow<'static, str>);

impl Format {
    pub const JSON: Format = Format(Cow::Borrowed("application/json"));

    /// A format for a custom codec, e.g. `Format::new("application/cbor")`.
    pub fn new(mime: impl Into<Cow<'static, str>>) -> Self {
        Format(mime.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
