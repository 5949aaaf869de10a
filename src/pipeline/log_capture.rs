//! In-memory log sink for tests that assert on emitted records.

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer that a `fmt` layer writes formatted lines into.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// A plain-text subscriber from `DEBUG` up that writes into this buffer.
    pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer).lines().map(str::to_string).collect()
    }

    /// Lines logged at `level` (e.g. `"ERROR"`) that mention `needle`.
    pub(crate) fn count(&self, level: &str, needle: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.split_whitespace().nth(1) == Some(level))
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
