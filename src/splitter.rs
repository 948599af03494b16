//! Element splitting: grouping lines into complete element fragments.
//!
//! A splitting pass reads lines from a stream and accumulates them into one
//! fragment, using a start pattern (and optional stop pattern) to find the
//! boundaries. When the line that opens the *next* element is read while
//! finishing the current one, it is parked in a capacity-one hand-off cache
//! together with the stream it came from, and the next pass picks it up.
//!
//! The whole pass (cache check, line loop, cache write) runs under one mutex
//! so concurrent callers can never interleave partial reads of the same
//! fragment; the stream's own lock nests inside it. Decoding of extracted
//! text happens outside both locks.

use std::io;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;

use crate::line::{LineEnding, read_line};
use crate::listener::{Context, ParseListener};
use crate::source::SharedStream;

/// Extracted element text plus the optional listener-derived context.
#[derive(Debug)]
pub(crate) struct Fragment {
    pub text: String,
    pub context: Option<Context>,
}

impl Fragment {
    /// An empty fragment means "no element available, stream exhausted".
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A line read past the end of the current element, parked for the pass
/// that will extract the element it belongs to. `stream: None` marks a line
/// whose stream had no further data; it is flushed as a fragment on its own.
struct PendingLine {
    line: String,
    stream: Option<SharedStream>,
}

/// Extraction failure.
#[derive(Debug)]
pub(crate) enum SplitError {
    Io(io::Error),
    Overflow { limit: usize },
}

impl From<io::Error> for SplitError {
    fn from(e: io::Error) -> Self {
        SplitError::Io(e)
    }
}

/// Splits a stream of lines into element fragments.
pub(crate) struct ElementSplitter {
    start: Regex,
    stop: Option<Regex>,
    max_element_size: Option<usize>,
    terminator: OnceLock<LineEnding>,
    cache: Mutex<Option<PendingLine>>,
}

impl ElementSplitter {
    pub fn new(start: Regex, stop: Option<Regex>, max_element_size: Option<usize>) -> Self {
        Self {
            start,
            stop,
            max_element_size,
            terminator: OnceLock::new(),
            cache: Mutex::new(None),
        }
    }

    /// The committed line terminator, once detection has happened.
    #[cfg(test)]
    pub fn terminator(&self) -> Option<LineEnding> {
        self.terminator.get().copied()
    }

    /// Extract the next element fragment.
    ///
    /// `stream` is the stream to read from; `None` means the caller knows the
    /// source is exhausted and only a cached flush-alone line may remain. An
    /// empty returned fragment means no element was available.
    pub fn next_fragment<R, Out>(
        &self,
        stream: Option<&SharedStream>,
        listener: &dyn ParseListener<R, Out>,
    ) -> Result<Fragment, SplitError> {
        let mut cache = self.cache.lock().unwrap();

        let mut text = String::new();
        let mut in_element = false;
        let mut active: Option<SharedStream> = stream.map(Arc::clone);

        // A cached line, if attributable to this pass, opens the fragment.
        if let Some(pending) = cache.take() {
            match pending.stream {
                None => {
                    // The line was the last of an exhausted stream; flush it
                    // as a fragment of its own.
                    self.append_line(&mut text, &pending.line)?;
                    in_element = true;
                    active = None;
                }
                Some(ref cached) if stream.is_some_and(|s| Arc::ptr_eq(cached, s)) => {
                    self.append_line(&mut text, &pending.line)?;
                    in_element = true;
                }
                Some(_) => {
                    // Belongs to a different stream; leave it for its owner.
                    *cache = Some(pending);
                }
            }
        }

        if let Some(shared) = &active {
            let mut stream = shared.lock().unwrap();
            while stream.has_data()? {
                let Some(line) = read_line(&mut stream, &self.terminator)? else {
                    break;
                };
                let line = listener.process_line(line);

                // A start match opens a new element unless we are inside one
                // and a stop pattern governs where elements end.
                if (!in_element || self.stop.is_none()) && self.start.is_match(&line) {
                    if !text.trim().is_empty() {
                        // The line belongs to the next element; park it and
                        // return what we have.
                        let stream_ref = if stream.has_data()? {
                            Some(Arc::clone(shared))
                        } else {
                            None
                        };
                        *cache = Some(PendingLine {
                            line,
                            stream: stream_ref,
                        });
                        return Ok(self.finish(text, listener));
                    }
                    in_element = true;
                }

                if in_element {
                    self.append_line(&mut text, &line)?;
                    if let Some(stop) = &self.stop {
                        if stop.is_match(&line) {
                            break;
                        }
                    }
                }
            }
        }

        Ok(self.finish(text, listener))
    }

    fn append_line(&self, text: &mut String, line: &str) -> Result<(), SplitError> {
        text.push_str(line);
        if let Some(ending) = self.terminator.get() {
            text.push_str(ending.as_str());
        }
        if let Some(limit) = self.max_element_size {
            if text.len() > limit {
                return Err(SplitError::Overflow { limit });
            }
        }
        Ok(())
    }

    fn finish<R, Out>(&self, text: String, listener: &dyn ParseListener<R, Out>) -> Fragment {
        let context = if text.trim().is_empty() {
            None
        } else {
            listener.derive_context(&text)
        };
        Fragment { text, context }
    }
}
