//! In-memory sink for tests

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Collects everything written through it
#[derive(Clone, Default)]
pub struct CapturedWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8(self.buf.lock().unwrap().clone()).unwrap()
    }

    /// Written records parsed as JSON lines
    pub fn lines(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

pub struct CapturedHandle {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for CapturedHandle {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedWriter {
    type Writer = CapturedHandle;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedHandle {
            buf: Arc::clone(&self.buf),
        }
    }
}
