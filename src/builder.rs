//! Builder for creating RecordReader instances.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::decode::DecoderFactory;
use crate::error::ConfigError;
use crate::listener::{ParseListener, Passthrough};
use crate::reader::{ReadStrategy, RecordReader, ValidatorSlots};
use crate::slot::SlotManager;
use crate::source::StreamSource;
use crate::splitter::ElementSplitter;
use crate::validate::Validator;

/// Configures and builds a [`RecordReader`].
///
/// A source and a decoder are required. Element patterns are optional: with
/// a start pattern (and a source that advises sharing) the stream is split
/// into elements so decoding can run in parallel; without one, decoding runs
/// directly against the source's streams. Patterns must match an entire
/// line, not a substring of it.
pub struct ReaderBuilder<R, Out = R> {
    source: Option<Box<dyn StreamSource>>,
    factory: Option<Arc<dyn DecoderFactory<R>>>,
    start_pattern: Option<String>,
    stop_pattern: Option<String>,
    max_element_size: Option<usize>,
    validator: Option<crate::reader::ValidatorFactory<R>>,
    listener: Box<dyn ParseListener<R, Out>>,
}

impl<R> ReaderBuilder<R, R>
where
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            source: None,
            factory: None,
            start_pattern: None,
            stop_pattern: None,
            max_element_size: None,
            validator: None,
            listener: Box::new(Passthrough),
        }
    }
}

impl<R> Default for ReaderBuilder<R, R>
where
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, Out> ReaderBuilder<R, Out>
where
    R: fmt::Debug + Send + 'static,
{
    /// Set the stream source records are read from.
    pub fn source(mut self, source: impl StreamSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Set the decoder factory that turns element text into records.
    pub fn decoder(mut self, factory: impl DecoderFactory<R> + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Regular expression identifying the line that starts a new element.
    /// Must match the whole line.
    pub fn start_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.start_pattern = Some(pattern.into());
        self
    }

    /// Regular expression identifying the line that ends an element. Only
    /// valid together with a start pattern; a single line may match both and
    /// form a complete element on its own.
    pub fn stop_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.stop_pattern = Some(pattern.into());
        self
    }

    /// Upper bound, in bytes, on one element's extracted text. Unlimited
    /// when unset; exceeding it fails the read with an overflow error.
    pub fn max_element_size(mut self, bytes: usize) -> Self {
        self.max_element_size = Some(bytes);
        self
    }

    /// Validate every decoded record with a validator created by `create`.
    /// One validator instance exists per worker thread.
    pub fn validate_with<V, F>(mut self, create: F) -> Self
    where
        V: Validator<R> + Send + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(move || {
            Box::new(create()) as Box<dyn Validator<R> + Send>
        }));
        self
    }

    /// Register a listener, replacing the default passthrough. The
    /// listener's `finalize` decides the type read calls return.
    pub fn listener<Out2>(
        self,
        listener: impl ParseListener<R, Out2> + 'static,
    ) -> ReaderBuilder<R, Out2> {
        ReaderBuilder {
            source: self.source,
            factory: self.factory,
            start_pattern: self.start_pattern,
            stop_pattern: self.stop_pattern,
            max_element_size: self.max_element_size,
            validator: self.validator,
            listener: Box::new(listener),
        }
    }

    /// Validate the configuration and build the reader.
    pub fn build(self) -> Result<RecordReader<R, Out>, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingSource)?;
        let factory = self.factory.ok_or(ConfigError::MissingDecoder)?;
        if self.stop_pattern.is_some() && self.start_pattern.is_none() {
            return Err(ConfigError::StopWithoutStart);
        }

        let start = compile_full_line("start", self.start_pattern)?;
        let stop = compile_full_line("stop", self.stop_pattern)?;

        let shares = source.shares_stream_across_threads();
        let strategy = match start {
            Some(start) if shares => ReadStrategy::SplitShared(ElementSplitter::new(
                start,
                stop,
                self.max_element_size,
            )),
            Some(_) => ReadStrategy::PerThreadStream,
            None if shares => ReadStrategy::SharedDecoder,
            None => ReadStrategy::PerThreadStream,
        };

        Ok(RecordReader::from_parts(
            source,
            SlotManager::new(factory),
            strategy,
            self.validator.map(ValidatorSlots::new),
            self.listener,
        ))
    }
}

/// Compile a pattern anchored to the whole line.
fn compile_full_line(
    which: &'static str,
    pattern: Option<String>,
) -> Result<Option<Regex>, ConfigError> {
    pattern
        .map(|p| {
            Regex::new(&format!("^(?:{p})$"))
                .map_err(|source| ConfigError::InvalidPattern { which, source })
        })
        .transpose()
}
