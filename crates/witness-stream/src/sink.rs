use std::io::{self, Write as _};

/// Destination for emitted stream text and error lines.
///
/// The default writes text to standard output and errors to standard
/// error; tests and headless callers inject their own implementation
/// instead of capturing the console.
pub trait EmitSink {
    /// Appends emitted text without any added framing.
    fn emit(&mut self, text: &str);

    /// Reports a human-readable error line.
    fn emit_error(&mut self, message: &str);
}

/// Sink writing to the process stdout/stderr, flushing after every
/// emission so partial tokens appear immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdioSink;

impl EmitSink for StdioSink {
    fn emit(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn emit_error(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// In-memory sink for tests and quiet callers.
#[derive(Clone, Debug, Default)]
pub struct BufferSink {
    pub output: String,
    pub errors: Vec<String>,
}

impl EmitSink for BufferSink {
    fn emit(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn emit_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
