//! CSV decoder: one row per record.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{Decoder, DecoderFactory, SharedStreamReader};
use crate::error::DecodeError;
use crate::source::SharedStream;

/// Factory for decoders over CSV input.
///
/// Headerless by default, mapping fields to the record type by position;
/// header-driven mapping is opt-in. Headerless is the right default when
/// rows are split into individual elements, where no row could carry the
/// header.
pub struct CsvDecoderFactory<R> {
    has_headers: bool,
    _marker: PhantomData<fn() -> R>,
}

impl<R> CsvDecoderFactory<R> {
    pub fn new() -> Self {
        Self {
            has_headers: false,
            _marker: PhantomData,
        }
    }

    /// Treat the first row of each input as a header (builder pattern).
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

impl<R> Default for CsvDecoderFactory<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DecoderFactory<R> for CsvDecoderFactory<R>
where
    R: DeserializeOwned + Send + 'static,
{
    fn for_stream(&self, stream: SharedStream) -> Box<dyn Decoder<R>> {
        let rows = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .from_reader(SharedStreamReader::new(stream))
            .into_deserialize();
        Box::new(CsvDecoder { rows })
    }
}

struct CsvDecoder<R> {
    rows: csv::DeserializeRecordsIntoIter<SharedStreamReader, R>,
}

impl<R> Decoder<R> for CsvDecoder<R>
where
    R: DeserializeOwned + Send + 'static,
{
    fn decode(&mut self) -> Result<Option<R>, DecodeError> {
        match self.rows.next() {
            None => Ok(None),
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) if e.is_io_error() => {
                let csv::ErrorKind::Io(io) = e.into_kind() else {
                    unreachable!("is_io_error implies an I/O error kind");
                };
                Err(DecodeError::Io(io))
            }
            Some(Err(e)) => Err(DecodeError::Malformed(Box::new(e))),
        }
    }
}
