//! Record validation invoked after decoding.

use crate::error::ValidationError;

/// Validates decoded records against semantic constraints.
///
/// Implementations may keep per-instance state; the reader creates one
/// instance per worker thread, lazily, and drops them all at teardown.
pub trait Validator<R> {
    /// Check one record, reporting every violated constraint.
    fn validate(&mut self, record: &R) -> Result<(), ValidationError>;
}

impl<R, F> Validator<R> for F
where
    F: FnMut(&R) -> Result<(), ValidationError>,
{
    fn validate(&mut self, record: &R) -> Result<(), ValidationError> {
        self(record)
    }
}
