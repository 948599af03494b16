//! Record decoding: turning element text or a live stream into typed records.
//!
//! This module provides:
//! - `Decoder`: Trait for pulling records out of a bound input
//! - `DecoderFactory`: Trait for binding decoders to streams or element text
//! - Built-in factories behind feature gates: `json` (stream of concatenated
//!   or newline-delimited JSON values), `csv` (row per record), `plaintext`
//!   (remaining text as one `String` record)

use crate::error::DecodeError;
use crate::source::{SharedStream, Stream, shared};

#[cfg(feature = "csv")]
mod csv_decode;
#[cfg(feature = "json")]
mod json;
#[cfg(feature = "plaintext")]
mod text;

#[cfg(feature = "csv")]
pub use csv_decode::CsvDecoderFactory;
#[cfg(feature = "json")]
pub use json::JsonDecoderFactory;
#[cfg(feature = "plaintext")]
pub use text::TextDecoderFactory;

/// Pulls records out of the input it was bound to at creation.
pub trait Decoder<R>: Send {
    /// Decode the next record. `Ok(None)` means the input is exhausted;
    /// malformed input fails with a `DecodeError` and is not retried.
    fn decode(&mut self) -> Result<Option<R>, DecodeError>;
}

/// Creates decoders bound to a particular input.
pub trait DecoderFactory<R>: Send + Sync {
    /// Bind a decoder to a live stream. The decoder may be called repeatedly
    /// until it reports exhaustion.
    fn for_stream(&self, stream: SharedStream) -> Box<dyn Decoder<R>>;

    /// Bind a decoder to already-extracted element text.
    fn for_text(&self, text: &str) -> Box<dyn Decoder<R>> {
        self.for_stream(shared(Stream::from_string("element", text)))
    }
}

/// `Read` adapter over a shared stream, locking per call.
#[cfg(any(feature = "json", feature = "csv"))]
pub(crate) struct SharedStreamReader {
    stream: SharedStream,
}

#[cfg(any(feature = "json", feature = "csv"))]
impl SharedStreamReader {
    pub fn new(stream: SharedStream) -> Self {
        Self { stream }
    }
}

#[cfg(any(feature = "json", feature = "csv"))]
impl std::io::Read for SharedStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(&mut *self.stream.lock().unwrap(), buf)
    }
}
