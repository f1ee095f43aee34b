use std::sync::{Arc, Mutex, PoisonError};

/// Per-request console buffer.
///
/// The engine's `print`/`debug` hooks write here instead of to the process
/// stdout, which stays reserved for the response document. Clones share the
/// same buffer so the hooks can own one while the dispatcher reads another.
#[derive(Debug, Clone, Default)]
pub struct OutputCapture {
    buffer: Arc<Mutex<String>>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line of console output, newline included.
    pub fn write_line(&self, text: &str) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push_str(text);
        buffer.push('\n');
    }

    /// Everything captured so far, verbatim.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
