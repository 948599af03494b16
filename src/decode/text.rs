//! Plaintext decoder: the remaining input as a single `String` record.

use std::io::Read;

use super::{Decoder, DecoderFactory};
use crate::error::DecodeError;
use crate::source::SharedStream;

/// Factory for decoders that yield the entire remaining text as one record.
///
/// Useful when elements are already split on boundaries and each element's
/// text is the record, or for whole-stream slurps.
#[derive(Debug, Default)]
pub struct TextDecoderFactory;

impl TextDecoderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DecoderFactory<String> for TextDecoderFactory {
    fn for_stream(&self, stream: SharedStream) -> Box<dyn Decoder<String>> {
        Box::new(TextDecoder { stream })
    }
}

struct TextDecoder {
    stream: SharedStream,
}

impl Decoder<String> for TextDecoder {
    fn decode(&mut self) -> Result<Option<String>, DecodeError> {
        let mut text = String::new();
        self.stream.lock().unwrap().read_to_string(&mut text)?;
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}
