//! JSON decoder: a stream of concatenated or newline-delimited JSON values,
//! one record each.

use std::io;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{Decoder, DecoderFactory, SharedStreamReader};
use crate::error::DecodeError;
use crate::source::SharedStream;

/// Factory for decoders over NDJSON / multi-document JSON input.
pub struct JsonDecoderFactory<R> {
    _marker: PhantomData<fn() -> R>,
}

impl<R> JsonDecoderFactory<R> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<R> Default for JsonDecoderFactory<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DecoderFactory<R> for JsonDecoderFactory<R>
where
    R: DeserializeOwned + Send + 'static,
{
    fn for_stream(&self, stream: SharedStream) -> Box<dyn Decoder<R>> {
        let values = serde_json::Deserializer::from_reader(SharedStreamReader::new(stream))
            .into_iter::<R>();
        Box::new(JsonDecoder { values })
    }
}

struct JsonDecoder<R> {
    values: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<SharedStreamReader>, R>,
}

impl<R> Decoder<R> for JsonDecoder<R>
where
    R: DeserializeOwned + Send + 'static,
{
    fn decode(&mut self) -> Result<Option<R>, DecodeError> {
        match self.values.next() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) => {
                if e.classify() == serde_json::error::Category::Io {
                    let kind = e.io_error_kind().unwrap_or(io::ErrorKind::Other);
                    Err(DecodeError::Io(io::Error::new(kind, e)))
                } else {
                    Err(DecodeError::Malformed(Box::new(e)))
                }
            }
        }
    }
}
