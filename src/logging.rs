use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static RAW_TERMINAL: AtomicBool = AtomicBool::new(false);

/// Record whether the console is in raw mode
pub fn set_raw_terminal(raw: bool) {
    RAW_TERMINAL.store(raw, Ordering::SeqCst);
}

/// Log sink that ends lines with `\r\n` while the console is raw
pub struct ConsoleWriter<W> {
    inner: W,
    raw: bool,
}

impl<W: Write> ConsoleWriter<W> {
    pub fn new(inner: W, raw: bool) -> Self {
        Self { inner, raw }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn console_stderr() -> ConsoleWriter<io::Stderr> {
    ConsoleWriter::new(io::stderr(), RAW_TERMINAL.load(Ordering::SeqCst))
}

impl<W: Write> Write for ConsoleWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw {
            return self.inner.write(buf);
        }
        let mut out = Vec::with_capacity(buf.len() + 2);
        for (i, &b) in buf.iter().enumerate() {
            if b == b'\n' && (i == 0 || buf[i - 1] != b'\r') {
                out.push(b'\r');
            }
            out.push(b);
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Install the stderr subscriber; later calls are ignored
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let stderr_layer = fmt::layer()
        .with_target(false) // Hide redundant target in text output
        .with_writer(console_stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
