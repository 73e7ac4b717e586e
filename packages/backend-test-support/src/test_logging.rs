//! Test logging initialization shared by unit and integration tests.

use std::io;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Initialize logging for tests. Safe to call from every test.
///
/// Filter precedence: `TEST_LOG`, then `RUST_LOG`, then `warn`. Warnings
/// are on by default so env-file diagnostics show up in failing tests.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // cargo/nextest capture
            .without_time()
            .with_target(false)
            .try_init()
            .ok(); // another harness may have installed one already
    });
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a thread-local subscriber and returns the warnings and
/// errors it logged, formatted without colours or timestamps.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = SharedBuffer::default();
    let subscriber = fmt()
        .with_writer(buffer.clone())
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().expect("log buffer poisoned").clone();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_warnings_keeps_warnings_and_drops_info() {
        let ((), logs) = capture_warnings(|| {
            tracing::info!("quiet");
            tracing::warn!(key = "value", "loud");
        });
        assert!(logs.contains("loud"));
        assert!(logs.contains("key="));
        assert!(!logs.contains("quiet"));
    }
}
