//! Listener callbacks invoked around extraction and decoding.

use std::any::Any;

/// Opaque per-element value a listener derives from extracted element text
/// and receives back alongside the decoded record.
///
/// Carried with the element through decoding so that the pairing survives
/// concurrent readers.
pub type Context = Box<dyn Any + Send>;

/// Callbacks a client can register to intercept elements as they are read.
///
/// All callbacks run synchronously on the calling worker thread, around the
/// corresponding extraction or decoding step.
pub trait ParseListener<R, Out = R>: Send + Sync {
    /// Rewrite a raw line before it is folded into an element, e.g. for
    /// redaction or normalization.
    fn process_line(&self, line: String) -> String {
        line
    }

    /// Derive an opaque context value from the final element text.
    fn derive_context(&self, element: &str) -> Option<Context> {
        let _ = element;
        None
    }

    /// Post-process the decoded record and its context into the value
    /// returned to the caller.
    fn finalize(&self, record: R, context: Option<Context>) -> Out;
}

/// Listener used when none is registered: lines and records pass through
/// unchanged.
pub(crate) struct Passthrough;

impl<R> ParseListener<R, R> for Passthrough {
    fn finalize(&self, record: R, _context: Option<Context>) -> R {
        record
    }
}
