//! Error types for fragio configuration, extraction, and decoding.
//!
//! This module provides:
//! - `ConfigError`: Reader misconfiguration, fatal at build time
//! - `ReadError`: Failures surfaced by `RecordReader::read`
//! - `DecodeError`: Failures surfaced by a `Decoder`
//! - `ValidationError`: Constraint violations reported by a `Validator`

use std::fmt;

use thiserror::Error;

/// Boxed dynamic error payload used by decoder implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reader misconfiguration detected when a builder is finalized.
///
/// These are never retried; the reader cannot be constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No decoder factory was supplied
    #[error("a decoder must be set before the reader can be built")]
    MissingDecoder,

    /// No stream source was supplied
    #[error("a stream source must be set before the reader can be built")]
    MissingSource,

    /// A stop pattern depends on a start pattern being present
    #[error("a stop pattern can only be used if a start pattern is also set")]
    StopWithoutStart,

    /// A start or stop pattern failed to compile
    #[error("invalid {which} pattern: {source}")]
    InvalidPattern {
        which: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Failures surfaced by `RecordReader::read`.
///
/// `Resource` abandons the current stream but leaves the reader usable for
/// whatever streams the source still has. `Parse` and `Validation` abort the
/// current read; there is no reliable way to skip to the next element once a
/// decode has gone wrong mid-stream.
#[derive(Debug, Error)]
pub enum ReadError<R: fmt::Debug> {
    /// I/O failure while extracting element text from a stream
    #[error("failed to extract element from {source_id}: {source}")]
    Resource {
        source_id: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoder rejected the element text as malformed
    #[error("failed to decode record from {source_id}: {source}; offending text: {text:?}")]
    Parse {
        source_id: String,
        /// The element text handed to the decoder; empty when decoding
        /// directly from a live stream.
        text: String,
        #[source]
        source: DecodeError,
    },

    /// A decoded record failed validation; the record is attached
    #[error("record from {source_id} failed validation: {source}")]
    Validation {
        source_id: String,
        record: R,
        #[source]
        source: ValidationError,
    },

    /// An element grew past the configured maximum size during extraction
    #[error("element from {source_id} exceeded the configured maximum size of {limit} bytes")]
    ElementOverflow { source_id: String, limit: usize },
}

/// Failures surfaced by a `Decoder`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// I/O error reading from the decoder's input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was readable but not decodable
    #[error("malformed input: {0}")]
    Malformed(BoxError),
}

/// One or more constraint violations reported by a `Validator`.
#[derive(Debug, Error)]
pub struct ValidationError {
    /// Human-readable description of each violated constraint
    pub violations: Vec<String>,
}

impl ValidationError {
    /// Create a validation error with a single violation.
    pub fn new(violation: impl Into<String>) -> Self {
        Self {
            violations: vec![violation.into()],
        }
    }

    /// Create a validation error from a list of violations.
    pub fn with_violations(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} constraint(s) violated", self.violations.len())?;
        for v in &self.violations {
            write!(f, "; {}", v)?;
        }
        Ok(())
    }
}
