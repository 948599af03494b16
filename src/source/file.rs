//! Plain-file stream source.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{SetupContext, SharedStream, Stream, StreamSource, shared};

/// Parameter key `FileSource` reads its path from during `initialize`.
pub const INPUT_FILE_PARAM: &str = "input.file";

#[derive(Debug, Default)]
struct FileSourceState {
    path: Option<PathBuf>,
    current: Option<SharedStream>,
    consumed: bool,
}

/// Stream source backed by a single plain file.
///
/// The path is given at construction or taken from the `input.file` setup
/// parameter. Files are line-structured text, so by default one stream may
/// be shared by multiple worker threads.
#[derive(Debug)]
pub struct FileSource {
    state: Mutex<FileSourceState>,
    shares: bool,
}

impl FileSource {
    /// Create a source that resolves its path from the setup context.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FileSourceState::default()),
            shares: true,
        }
    }

    /// Create a source over a known path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let source = Self::new();
        source.state.lock().unwrap().path = Some(path.into());
        source
    }

    /// Override the sharing advice (builder pattern).
    pub fn with_sharing(mut self, shares: bool) -> Self {
        self.shares = shares;
        self
    }

    fn open(path: &PathBuf) -> io::Result<SharedStream> {
        let file = File::open(path)?;
        let id = path.to_string_lossy().into_owned();
        Ok(shared(Stream::new(id, Box::new(BufReader::new(file)))))
    }

    // Open and install the file's one stream. Caller holds the state lock,
    // so check and advance are a single atomic step.
    fn advance(&self, state: &mut FileSourceState) -> io::Result<Option<SharedStream>> {
        if state.consumed {
            return Ok(None);
        }
        let path = state.path.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "file source not initialized")
        })?;
        let stream = Self::open(&path)?;
        state.current = Some(Arc::clone(&stream));
        state.consumed = true;
        Ok(Some(stream))
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSource for FileSource {
    fn initialize(&self, ctx: &SetupContext) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.path.is_none() {
            let path = ctx.param(INPUT_FILE_PARAM).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("file source requires a path or an '{INPUT_FILE_PARAM}' parameter"),
                )
            })?;
            state.path = Some(PathBuf::from(path));
        }
        state.current = None;
        state.consumed = false;
        Ok(())
    }

    fn next_stream(&self) -> io::Result<Option<SharedStream>> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state)
    }

    fn current_stream(&self) -> io::Result<Option<SharedStream>> {
        let mut state = self.state.lock().unwrap();
        if let Some(current) = &state.current {
            return Ok(Some(Arc::clone(current)));
        }
        self.advance(&mut state)
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
        state.consumed = true;
        Ok(())
    }

    fn id(&self) -> String {
        let state = self.state.lock().unwrap();
        match &state.path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => "file-source".to_string(),
        }
    }
}
