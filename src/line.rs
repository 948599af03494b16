//! Line-terminator detection and terminator-aware line reads.
//!
//! The terminator convention of an unknown stream is detected at most once
//! per reader instance: the first read scans byte by byte until it sees
//! `\n`, `\r`, or `\r\n`, commits the result to a `OnceLock`, and every
//! subsequent read splits on the committed terminator directly. Reaching end
//! of stream before any terminator yields the collected bytes as a final
//! terminator-less line and commits nothing.

use std::io::{self, BufRead};
use std::sync::OnceLock;

use tracing::debug;

use crate::source::Stream;

/// The line-ending convention detected for a reader instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r`
    Cr,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator as the string it appears as in the stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Final byte of the terminator, the split point for `read_until`.
    fn last_byte(&self) -> u8 {
        match self {
            LineEnding::Lf | LineEnding::CrLf => b'\n',
            LineEnding::Cr => b'\r',
        }
    }
}

fn next_byte(stream: &mut Stream) -> io::Result<Option<u8>> {
    let byte = {
        let buf = stream.fill_buf()?;
        buf.first().copied()
    };
    if byte.is_some() {
        stream.consume(1);
    }
    Ok(byte)
}

/// One-byte lookahead without consuming.
fn peek_byte(stream: &mut Stream) -> io::Result<Option<u8>> {
    Ok(stream.fill_buf()?.first().copied())
}

/// Read one line from `stream`, excluding the terminator.
///
/// Detects and commits the terminator on first use; `Ok(None)` means the
/// stream was already exhausted.
pub(crate) fn read_line(
    stream: &mut Stream,
    terminator: &OnceLock<LineEnding>,
) -> io::Result<Option<String>> {
    if let Some(ending) = terminator.get() {
        return read_terminated(stream, *ending);
    }

    let mut collected = Vec::new();
    loop {
        match next_byte(stream)? {
            None => {
                // EOF before any terminator: yield what we have, commit nothing
                if collected.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Some(b'\n') => {
                commit(terminator, LineEnding::Lf);
                break;
            }
            Some(b'\r') => {
                if peek_byte(stream)? == Some(b'\n') {
                    stream.consume(1);
                    commit(terminator, LineEnding::CrLf);
                } else {
                    // The peeked byte stays in the stream for the next read
                    commit(terminator, LineEnding::Cr);
                }
                break;
            }
            Some(byte) => collected.push(byte),
        }
    }

    Ok(Some(String::from_utf8_lossy(&collected).into_owned()))
}

fn commit(terminator: &OnceLock<LineEnding>, ending: LineEnding) {
    // Redundant concurrent writes of the same value are harmless
    if terminator.set(ending).is_ok() {
        debug!(terminator = ?ending, "determined line terminator");
    }
}

/// Read one line using an already-committed terminator.
fn read_terminated(stream: &mut Stream, ending: LineEnding) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = stream.read_until(ending.last_byte(), &mut buf)?;
    if read == 0 {
        return Ok(None);
    }

    let suffix: &[u8] = match ending {
        LineEnding::Lf => b"\n",
        LineEnding::Cr => b"\r",
        LineEnding::CrLf => b"\r\n",
    };
    if buf.ends_with(suffix) {
        buf.truncate(buf.len() - suffix.len());
    } else if ending == LineEnding::CrLf && buf.ends_with(b"\n") {
        buf.truncate(buf.len() - 1);
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
