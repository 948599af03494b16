//! # fragio
//!
//! Streaming record extraction with parallel-safe element splitting.
//!
//! ## Overview
//!
//! fragio reads typed records out of character streams. Its core is a
//! splitter that cuts a stream into discrete, independently-decodable
//! element fragments using a start pattern (and optional stop pattern),
//! without needing a grammar for the record's internals:
//!
//! - **Terminator autodetection**: The line-ending convention (`\n`, `\r`,
//!   `\r\n`) of an unknown stream is detected once per reader and reused for
//!   the rest of the run.
//! - **Parallel decoding**: Any number of worker threads may call `read`
//!   concurrently. Depending on the source's sharing advice and whether a
//!   start pattern is configured, threads share one decoder, hold one
//!   decoder and stream each, or share one stream for cheap splitting while
//!   decoding extracted elements independently.
//! - **At-most-once attribution**: Element boundaries are discovered by
//!   racing readers, but a capacity-one hand-off cache guarantees every
//!   element is handed to exactly one decoder.
//! - **Validation and listeners**: Decoded records can be validated per
//!   thread, and a listener can rewrite lines, attach per-element context,
//!   and post-process records before they reach the caller.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fragio::{InMemoryStreamSource, ReaderBuilder, SetupContext, TextDecoderFactory};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = ReaderBuilder::<String>::new()
//!         .source(InMemoryStreamSource::from_string("demo", "A1\nA2\nB1\n"))
//!         .decoder(TextDecoderFactory::new())
//!         .start_pattern("[A-Za-z].*")
//!         .build()?;
//!
//!     reader.setup(&SetupContext::new())?;
//!     while let Some(element) = reader.read()? {
//!         println!("{element:?}");
//!     }
//!     reader.cleanup()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json` - NDJSON / multi-document JSON decoder (enabled by default)
//! - `csv` - CSV row-per-record decoder
//! - `plaintext` - whole-text decoder (enabled by default)
//!
//! ## Sharing modes & semantics
//!
//! The reader picks one of three modes when it is built:
//!
//! - **Shared decoder** (no start pattern, source advises sharing): one
//!   decoder over one shared stream; decoding itself is serialized.
//! - **Per-thread stream** (source advises against sharing): each thread
//!   binds its own decoder to its own stream and requests the next stream
//!   when it runs dry; threads drain the source in parallel.
//! - **Split shared stream** (start pattern, source advises sharing): the
//!   live stream is only ever touched under the splitter's lock, for the
//!   cheap regex scan; each extracted element is decoded by its thread from
//!   an in-memory copy, outside every lock. This is where parallelism pays:
//!   extraction is I/O-bound and brief, decoding is the expensive part.
//!
//! Within one stream, elements are extracted in the order their start lines
//! appear. Across streams drained in parallel there is no ordering
//! guarantee.

// Core modules
pub mod builder;
pub mod decode;
pub mod error;
pub mod listener;
pub mod reader;
pub mod source;
pub mod validate;

mod line;
mod slot;
mod splitter;

// Re-exports for convenience
pub use builder::ReaderBuilder;
#[cfg(feature = "csv")]
pub use decode::CsvDecoderFactory;
#[cfg(feature = "json")]
pub use decode::JsonDecoderFactory;
#[cfg(feature = "plaintext")]
pub use decode::TextDecoderFactory;
pub use decode::{Decoder, DecoderFactory};
pub use error::{BoxError, ConfigError, DecodeError, ReadError, ValidationError};
pub use line::LineEnding;
pub use listener::{Context, ParseListener};
pub use reader::RecordReader;
pub use source::{
    FileSource, InMemoryStreamSource, SetupContext, SharedStream, Stream, StreamSource,
};
pub use validate::Validator;

// Internal test modules (see src/tests)
#[cfg(test)]
mod tests;
