//! Decoder slot management: which decoder and which stream a worker thread
//! reads with, under one of three sharing modes.
//!
//! Per-thread slots are owned outright for the duration of a read: they are
//! removed from a registry keyed by thread id and reinserted afterwards.
//! The mode-A shared slot lives behind its own synchronized registry cell so
//! only one caller ever constructs it, and discarding a superseded slot is a
//! compare-and-clear no-op.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use tracing::warn;

use crate::decode::{Decoder, DecoderFactory};
use crate::source::{SharedStream, StreamSource};

/// A decoder bound to the stream it reads from.
pub(crate) struct BoundSlot<R> {
    pub decoder: Box<dyn Decoder<R>>,
    pub stream: SharedStream,
}

enum ThreadSlot<R> {
    Bound(BoundSlot<R>),
    Extract(SharedStream),
}

pub(crate) struct SlotManager<R> {
    factory: Arc<dyn DecoderFactory<R>>,
    shared: Mutex<Option<Arc<Mutex<BoundSlot<R>>>>>,
    threads: Mutex<HashMap<ThreadId, ThreadSlot<R>>>,
}

impl<R> SlotManager<R> {
    pub fn new(factory: Arc<dyn DecoderFactory<R>>) -> Self {
        Self {
            factory,
            shared: Mutex::new(None),
            threads: Mutex::new(HashMap::new()),
        }
    }

    fn take_thread(&self) -> Option<ThreadSlot<R>> {
        self.threads.lock().unwrap().remove(&thread::current().id())
    }

    fn put_thread(&self, slot: ThreadSlot<R>) {
        self.threads.lock().unwrap().insert(thread::current().id(), slot);
    }

    fn release_stream(&self, source: &dyn StreamSource, stream: &SharedStream) {
        if let Err(e) = source.discard(stream) {
            // Worst case a failure gets logged more than once
            warn!(source = %source.id(), error = %e, "failed to release stream back to source");
        }
    }

    /// The single shared slot, created under the registry lock by whichever
    /// caller gets there first. `None` when the source has no stream.
    pub fn shared_slot(
        &self,
        source: &dyn StreamSource,
    ) -> io::Result<Option<Arc<Mutex<BoundSlot<R>>>>> {
        let mut shared = self.shared.lock().unwrap();
        if let Some(slot) = &*shared {
            return Ok(Some(Arc::clone(slot)));
        }
        match source.current_stream()? {
            Some(stream) => {
                let slot = Arc::new(Mutex::new(BoundSlot {
                    decoder: self.factory.for_stream(Arc::clone(&stream)),
                    stream,
                }));
                *shared = Some(Arc::clone(&slot));
                Ok(Some(slot))
            }
            None => Ok(None),
        }
    }

    /// Drop the shared slot if `stale` is still the current one; a discard
    /// arriving after the slot was superseded does nothing.
    pub fn discard_shared(&self, stale: &Arc<Mutex<BoundSlot<R>>>, source: &dyn StreamSource) {
        {
            let slot = stale.lock().unwrap();
            self.release_stream(source, &slot.stream);
        }
        let mut shared = self.shared.lock().unwrap();
        if let Some(current) = &*shared {
            if Arc::ptr_eq(current, stale) {
                *shared = None;
            }
        }
    }

    /// This thread's bound slot, reusing the previous one while its stream
    /// still has data and otherwise binding a new stream from the source.
    pub fn thread_slot(&self, source: &dyn StreamSource) -> io::Result<Option<BoundSlot<R>>> {
        if let Some(ThreadSlot::Bound(slot)) = self.take_thread() {
            // A probe failure means the stream was closed beneath us; treat
            // it the same as exhaustion and move on.
            let reusable = slot.stream.lock().unwrap().has_data().unwrap_or(false);
            if reusable {
                return Ok(Some(slot));
            }
            self.release_stream(source, &slot.stream);
        }
        match source.next_stream()? {
            Some(stream) => Ok(Some(BoundSlot {
                decoder: self.factory.for_stream(Arc::clone(&stream)),
                stream,
            })),
            None => Ok(None),
        }
    }

    pub fn store_thread(&self, slot: BoundSlot<R>) {
        self.put_thread(ThreadSlot::Bound(slot));
    }

    pub fn discard_thread(&self, slot: BoundSlot<R>, source: &dyn StreamSource) {
        self.release_stream(source, &slot.stream);
    }

    /// The stream this thread extracts elements from: its retained handle if
    /// it has one, otherwise the source's current stream.
    pub fn extract_stream(&self, source: &dyn StreamSource) -> io::Result<Option<SharedStream>> {
        if let Some(ThreadSlot::Extract(stream)) = self.take_thread() {
            return Ok(Some(stream));
        }
        source.current_stream()
    }

    pub fn store_extract(&self, stream: SharedStream) {
        self.put_thread(ThreadSlot::Extract(stream));
    }

    pub fn discard_extract(&self, stream: &SharedStream, source: &dyn StreamSource) {
        self.release_stream(source, stream);
    }

    /// Drop every slot. Part of reader teardown.
    pub fn clear(&self) {
        *self.shared.lock().unwrap() = None;
        self.threads.lock().unwrap().clear();
    }

    /// Bind a decoder to already-extracted element text.
    pub fn decoder_for_text(&self, text: &str) -> Box<dyn Decoder<R>> {
        self.factory.for_text(text)
    }
}
