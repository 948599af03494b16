//! In-memory stream source for testing and embedding.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use super::{SetupContext, SharedStream, Stream, StreamSource, shared};

#[derive(Debug)]
struct MemoryState {
    pending: VecDeque<String>,
    current: Option<SharedStream>,
    served: usize,
}

/// Stream source over a sequence of in-memory documents, one stream each.
///
/// A multi-document source stands in for sources that hand out several
/// sequential streams (archive entries, rotated files).
#[derive(Debug)]
pub struct InMemoryStreamSource {
    id: String,
    shares: bool,
    state: Mutex<MemoryState>,
}

impl InMemoryStreamSource {
    /// Create a source over a single document.
    pub fn from_string(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self::from_strings(id, vec![data.into()])
    }

    /// Create a source over multiple documents, served in order.
    pub fn from_strings(id: impl Into<String>, docs: Vec<String>) -> Self {
        Self {
            id: id.into(),
            shares: true,
            state: Mutex::new(MemoryState {
                pending: docs.into(),
                current: None,
                served: 0,
            }),
        }
    }

    /// Override the sharing advice (builder pattern).
    pub fn with_sharing(mut self, shares: bool) -> Self {
        self.shares = shares;
        self
    }

    fn advance(&self, state: &mut MemoryState) -> Option<SharedStream> {
        let doc = state.pending.pop_front()?;
        let stream_id = format!("{}#{}", self.id, state.served);
        state.served += 1;
        let stream = shared(Stream::from_string(stream_id, doc));
        state.current = Some(Arc::clone(&stream));
        Some(stream)
    }
}

impl StreamSource for InMemoryStreamSource {
    fn initialize(&self, _ctx: &SetupContext) -> io::Result<()> {
        Ok(())
    }

    fn next_stream(&self) -> io::Result<Option<SharedStream>> {
        let mut state = self.state.lock().unwrap();
        Ok(self.advance(&mut state))
    }

    fn current_stream(&self) -> io::Result<Option<SharedStream>> {
        let mut state = self.state.lock().unwrap();
        if let Some(current) = &state.current {
            return Ok(Some(Arc::clone(current)));
        }
        Ok(self.advance(&mut state))
    }

    fn shares_stream_across_threads(&self) -> bool {
        self.shares
    }

    fn discard(&self, stream: &SharedStream) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(current) = &state.current {
            if Arc::ptr_eq(current, stream) {
                state.current = None;
            }
        }
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.current = None;
        state.pending.clear();
        Ok(())
    }

    fn id(&self) -> String {
        self.id.clone()
    }
}
