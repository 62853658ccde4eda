//! In-memory log capture for tests.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

use crate::diagnostics::Diagnostics;

/// Collects every event logged through its [`Diagnostics`] handle.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A diagnostics handle writing plain text into this buffer.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();
        Diagnostics::from_subscriber(subscriber)
    }

    /// Everything captured so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

pub struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
