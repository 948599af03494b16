//! Stream sources that supply the raw character streams records are read from.
//!
//! This module provides:
//! - `Stream` / `SharedStream`: An open, identified character stream and the
//!   `Arc<Mutex<..>>` handle worker threads share it through
//! - `StreamSource`: Trait for suppliers of zero or more sequential streams
//! - `SetupContext`: Key/value parameters bound at setup time
//! - `FileSource` and `InMemoryStreamSource` implementations

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Cursor, Read};
use std::sync::{Arc, Mutex};

mod file;
mod memory;

pub use file::{FileSource, INPUT_FILE_PARAM};
pub use memory::InMemoryStreamSource;

/// An open, ordered character stream with an identifier for error messages.
///
/// The stream is read through the standard `Read`/`BufRead` traits; fragio
/// never closes it other than by dropping it via its source's discard
/// contract.
pub struct Stream {
    id: String,
    inner: Box<dyn BufRead + Send>,
}

impl Stream {
    /// Wrap an open buffered reader.
    pub fn new(id: impl Into<String>, inner: Box<dyn BufRead + Send>) -> Self {
        Self {
            id: id.into(),
            inner,
        }
    }

    /// Create a stream over an in-memory string.
    pub fn from_string(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(id, Box::new(Cursor::new(data.into().into_bytes())))
    }

    /// Identifier of this stream, used in error messages.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True if at least one more byte can be read before end of stream.
    ///
    /// May block until data is available or the stream ends.
    pub fn has_data(&mut self) -> io::Result<bool> {
        Ok(!self.inner.fill_buf()?.is_empty())
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for Stream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

/// The unit of sharing between worker threads.
///
/// Stream identity (for the pending-line cache and for discards) is `Arc`
/// pointer identity, compared with `Arc::ptr_eq`.
pub type SharedStream = Arc<Mutex<Stream>>;

/// Wrap a stream into a shareable handle.
pub fn shared(stream: Stream) -> SharedStream {
    Arc::new(Mutex::new(stream))
}

/// String parameters handed to a source when the reader is set up.
///
/// Stands in for whatever external execution context supplies file or
/// location parameters; sources pick out the keys they understand (e.g.
/// `FileSource` reads `input.file`).
#[derive(Debug, Default, Clone)]
pub struct SetupContext {
    params: HashMap<String, String>,
}

impl SetupContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter (builder pattern).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Supplier of zero or more sequential character streams.
///
/// A source also advertises whether one of its streams may be read by
/// multiple worker threads concurrently; the reader picks its sharing mode
/// from that advice.
pub trait StreamSource: Send + Sync {
    /// Bind the source to its runtime parameters. Must be called before the
    /// first stream is requested.
    fn initialize(&self, ctx: &SetupContext) -> io::Result<()>;

    /// Advance to and return the next stream, or `None` when the source is
    /// exhausted.
    fn next_stream(&self) -> io::Result<Option<SharedStream>>;

    /// Return the current stream without advancing past an unconsumed one,
    /// or `None` when the source is exhausted.
    fn current_stream(&self) -> io::Result<Option<SharedStream>>;

    /// Whether one stream may be read by multiple threads concurrently.
    fn shares_stream_across_threads(&self) -> bool;

    /// Release a stream back to the source. Discarding a stream the source
    /// no longer considers current is a no-op.
    fn discard(&self, stream: &SharedStream) -> io::Result<()>;

    /// Close all streams. Called exactly once at teardown.
    fn close(&self) -> io::Result<()>;

    /// Identifier of this source, used in error messages.
    fn id(&self) -> String;
}
