use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console logging driven by `RUST_LOG` (default `info`). Later calls are no-ops.
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).try_init();
    });
}

/// Console logging plus a plain-text copy appended to `log_file`.
/// The log directory is created if needed. Later calls are no-ops.
pub fn init_tracing_with_file(log_file: &Path) -> io::Result<()> {
    if let Some(dir) = log_file.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    INIT_ONCE.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .try_init();
    });
    Ok(())
}

// -------- export file placement --------

/// OS errors worth retrying: another process (indexer, AV scanner, sync client)
/// briefly holding the export file. Raw codes are the Windows sharing/lock family.
fn is_transient(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 225 | 1224))
}

fn retry_io<T>(attempts: usize, step_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 0usize;
    loop {
        match op() {
            Err(e) if is_transient(&e) && attempt + 1 < attempts => {
                attempt += 1;
                sleep(Duration::from_millis(step_ms.saturating_mul(attempt as u64)));
            }
            other => return other,
        }
    }
}

/// Create or truncate `path`, retrying while it is transiently locked.
pub fn create_with_backoff(path: &Path, attempts: usize, step_ms: u64) -> io::Result<File> {
    retry_io(attempts, step_ms, || File::create(path))
}

/// Delete `path`; a file that is already gone counts as removed.
pub fn remove_with_backoff(path: &Path, attempts: usize, step_ms: u64) -> io::Result<()> {
    retry_io(attempts, step_ms, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
}

/// Put the finished temp file at `dest`, overwriting a previous export.
/// Falls back to copy + delete when the rename keeps failing.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> io::Result<()> {
    const ATTEMPTS: usize = 20;
    const STEP_MS: u64 = 50;
    if let Err(e) = retry_io(ATTEMPTS, STEP_MS, || fs::rename(tmp, dest)) {
        tracing::debug!(error = %e, tmp = %tmp.display(), dest = %dest.display(), "rename failed; copying instead");
        retry_io(ATTEMPTS, STEP_MS, || fs::copy(tmp, dest))?;
        remove_with_backoff(tmp, ATTEMPTS, STEP_MS)?;
    }
    Ok(())
}
