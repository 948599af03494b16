//! The record reader: retry loop, validation, listener glue, lifecycle.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use crate::error::{ReadError, ValidationError};
use crate::listener::ParseListener;
use crate::slot::SlotManager;
use crate::source::{SetupContext, StreamSource};
use crate::splitter::{ElementSplitter, SplitError};
use crate::validate::Validator;

/// How `read` obtains records, fixed when the reader is built from the
/// start-pattern presence and the source's sharing advice.
pub(crate) enum ReadStrategy {
    /// One decoder over one shared stream; all decoding serialized.
    SharedDecoder,
    /// Decoder and stream per thread; exhausted streams replaced from the
    /// source.
    PerThreadStream,
    /// Shared stream split into element fragments under the splitter's
    /// lock; each fragment decoded by its extracting thread outside it.
    SplitShared(ElementSplitter),
}

pub(crate) type ValidatorFactory<R> = Box<dyn Fn() -> Box<dyn Validator<R> + Send> + Send + Sync>;

/// Per-thread validator handles, lazily created and dropped at teardown.
pub(crate) struct ValidatorSlots<R> {
    create: ValidatorFactory<R>,
    handles: Mutex<HashMap<ThreadId, Box<dyn Validator<R> + Send>>>,
}

impl<R> ValidatorSlots<R> {
    pub fn new(create: ValidatorFactory<R>) -> Self {
        Self {
            create,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn validate(&self, record: &R) -> Result<(), ValidationError> {
        let id = thread::current().id();
        let taken = self.handles.lock().unwrap().remove(&id);
        let mut handle = taken.unwrap_or_else(|| (self.create)());
        let result = handle.validate(record);
        self.handles.lock().unwrap().insert(id, handle);
        result
    }

    fn reset(&self) {
        self.handles.lock().unwrap().clear();
    }
}

/// Reads decoded records from a stream source, optionally splitting the
/// source into element fragments so the more expensive decoding can run in
/// parallel across worker threads.
///
/// Construct through [`ReaderBuilder`](crate::builder::ReaderBuilder). Call
/// [`setup`](Self::setup) once before the first read and
/// [`cleanup`](Self::cleanup) exactly once after the last, even when a read
/// failed. Any number of threads may call [`read`](Self::read) concurrently.
pub struct RecordReader<R, Out = R> {
    source: Box<dyn StreamSource>,
    slots: SlotManager<R>,
    strategy: ReadStrategy,
    validators: Option<ValidatorSlots<R>>,
    listener: Box<dyn ParseListener<R, Out>>,
}

impl<R, Out> fmt::Debug for RecordReader<R, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordReader")
            .field("validating", &self.validators.is_some())
            .finish_non_exhaustive()
    }
}

impl<R, Out> RecordReader<R, Out>
where
    R: fmt::Debug + Send + 'static,
{
    pub(crate) fn from_parts(
        source: Box<dyn StreamSource>,
        slots: SlotManager<R>,
        strategy: ReadStrategy,
        validators: Option<ValidatorSlots<R>>,
        listener: Box<dyn ParseListener<R, Out>>,
    ) -> Self {
        Self {
            source,
            slots,
            strategy,
            validators,
            listener,
        }
    }

    /// Whether decoded records are validated before being returned.
    pub fn is_validating(&self) -> bool {
        self.validators.is_some()
    }

    /// Bind the stream source to its runtime parameters. Must run before the
    /// first `read`.
    pub fn setup(&self, ctx: &SetupContext) -> Result<(), ReadError<R>> {
        self.source.initialize(ctx).map_err(|e| self.resource(e))
    }

    /// Release per-thread validator state, drop all decoder slots, and close
    /// the source. Must run exactly once after the last `read`, even if a
    /// read failed.
    pub fn cleanup(&self) -> Result<(), ReadError<R>> {
        if let Some(validators) = &self.validators {
            validators.reset();
        }
        self.slots.clear();
        self.source.close().map_err(|e| self.resource(e))
    }

    /// Read the next record, or `Ok(None)` once every stream the source can
    /// supply is exhausted.
    ///
    /// Retries internally across exhausted streams; decode and validation
    /// failures are never retried and propagate immediately.
    pub fn read(&self) -> Result<Option<Out>, ReadError<R>> {
        let source = self.source.as_ref();

        let (record, context) = loop {
            match &self.strategy {
                ReadStrategy::SplitShared(splitter) => {
                    let Some(stream) =
                        self.slots.extract_stream(source).map_err(|e| self.resource(e))?
                    else {
                        return Ok(None);
                    };

                    // Get our element out of the shared stream as quickly as
                    // possible; decoding happens after the locks are gone.
                    let fragment = match splitter.next_fragment(Some(&stream), self.listener.as_ref())
                    {
                        Ok(fragment) => fragment,
                        Err(e) => {
                            // Mid-element the stream is unusable; abandon it
                            // so the next read moves on
                            self.slots.discard_extract(&stream, source);
                            return Err(self.split_error(e));
                        }
                    };

                    if fragment.is_empty() {
                        // Stream exhausted; release it and try the next one
                        self.slots.discard_extract(&stream, source);
                        continue;
                    }
                    self.slots.store_extract(stream);

                    let mut decoder = self.slots.decoder_for_text(&fragment.text);
                    match decoder.decode() {
                        Ok(Some(record)) => break (record, fragment.context),
                        Ok(None) => continue,
                        Err(e) => {
                            return Err(ReadError::Parse {
                                source_id: source.id(),
                                text: fragment.text,
                                source: e,
                            });
                        }
                    }
                }

                ReadStrategy::SharedDecoder => {
                    let Some(slot) =
                        self.slots.shared_slot(source).map_err(|e| self.resource(e))?
                    else {
                        return Ok(None);
                    };
                    let outcome = slot.lock().unwrap().decoder.decode();
                    match outcome {
                        Ok(Some(record)) => break (record, None),
                        Ok(None) => self.slots.discard_shared(&slot, source),
                        Err(e) => {
                            // There may be data left, but with no way to skip
                            // to the next element the stream is unusable
                            self.slots.discard_shared(&slot, source);
                            return Err(ReadError::Parse {
                                source_id: source.id(),
                                text: String::new(),
                                source: e,
                            });
                        }
                    }
                }

                ReadStrategy::PerThreadStream => {
                    let Some(mut slot) =
                        self.slots.thread_slot(source).map_err(|e| self.resource(e))?
                    else {
                        return Ok(None);
                    };
                    match slot.decoder.decode() {
                        Ok(Some(record)) => {
                            self.slots.store_thread(slot);
                            break (record, None);
                        }
                        Ok(None) => self.slots.discard_thread(slot, source),
                        Err(e) => {
                            self.slots.discard_thread(slot, source);
                            return Err(ReadError::Parse {
                                source_id: source.id(),
                                text: String::new(),
                                source: e,
                            });
                        }
                    }
                }
            }
        };

        if let Some(validators) = &self.validators {
            if let Err(e) = validators.validate(&record) {
                return Err(ReadError::Validation {
                    source_id: source.id(),
                    record,
                    source: e,
                });
            }
        }

        Ok(Some(self.listener.finalize(record, context)))
    }

    fn resource(&self, source: io::Error) -> ReadError<R> {
        ReadError::Resource {
            source_id: self.source.id(),
            source,
        }
    }

    fn split_error(&self, e: SplitError) -> ReadError<R> {
        match e {
            SplitError::Io(source) => self.resource(source),
            SplitError::Overflow { limit } => ReadError::ElementOverflow {
                source_id: self.source.id(),
                limit,
            },
        }
    }
}
