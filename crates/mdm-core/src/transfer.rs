//! Streams one resolved URL into a download folder.
//!
//! Writes to `<name>.part`, reports progress to the monitor after every
//! received chunk, applies the throttle, and renames to the final name on
//! success. The gate slot is held from connect to rename.

use crate::monitor::{ProgressMonitor, TransferLabels};
use crate::throttle::THROTTLE_PAUSE;
use crate::url_model::derive_filename;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Speed is re-measured over windows of this length.
const SPEED_WINDOW: Duration = Duration::from_secs(1);

/// Path for the temp file: appends `.part` to the final path (e.g. `a.rar` → `a.rar.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Error from a single transfer attempt. Logged and turned into `None` by [`Transfer::run`].
#[derive(Debug)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Fewer bytes arrived than the server announced.
    PartialTransfer { expected: u64, received: u64 },
    /// Creating, writing or renaming the file failed.
    Storage(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            TransferError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Storage(e) => Some(e),
            TransferError::Http(_) | TransferError::PartialTransfer { .. } => None,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        TransferError::Curl(e)
    }
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        TransferError::Storage(e)
    }
}

/// What to download and how to label it.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    pub dest_dir: PathBuf,
    /// Name reported by the unlock service; the URL path is used when absent.
    pub filename: Option<String>,
    /// Monitor key for the owning movie folder, e.g. `"Dune (2021) [1080p]"`.
    pub movie: String,
    pub labels: TransferLabels,
}

impl TransferRequest {
    pub fn final_path(&self) -> PathBuf {
        self.dest_dir
            .join(derive_filename(&self.url, self.filename.as_deref()))
    }
}

/// Downloads one request. `None` means the attempt failed and left no temp file behind.
pub trait FileFetcher: Send + Sync {
    fn fetch(&self, req: &TransferRequest) -> Option<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Curl receive buffer size, i.e. the chunk granularity for progress and throttling.
    pub chunk_size: usize,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("mdm/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Single-stream HTTP GET transfer bound to the shared monitor.
#[derive(Debug, Clone)]
pub struct Transfer {
    monitor: Arc<ProgressMonitor>,
    options: TransferOptions,
}

impl Transfer {
    pub fn new(monitor: Arc<ProgressMonitor>, options: TransferOptions) -> Self {
        Self { monitor, options }
    }

    /// Runs the transfer, logging any failure. `Some(path)` on success or when the file already exists.
    pub fn run(&self, req: &TransferRequest) -> Option<PathBuf> {
        match self.try_run(req) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    movie = %req.movie,
                    host = %req.labels.host,
                    service = %req.labels.service,
                    "transfer of {} failed: {}",
                    req.final_path().display(),
                    e
                );
                None
            }
        }
    }

    pub fn try_run(&self, req: &TransferRequest) -> Result<PathBuf, TransferError> {
        fs::create_dir_all(&req.dest_dir)?;
        let final_path = req.final_path();
        let filename = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if final_path.exists() {
            tracing::info!(movie = %req.movie, "skipping existing file {}", filename);
            return Ok(final_path);
        }

        let tmp = temp_path(&final_path);
        let _permit = self.monitor.gate().acquire();
        self.monitor
            .start_transfer(&req.movie, &filename, req.labels.clone());
        tracing::info!(movie = %req.movie, host = %req.labels.host, "downloading {}", filename);

        let started = Instant::now();
        let outcome = self
            .stream(&req.url, &tmp, &req.movie, &filename)
            .and_then(|written| {
                fs::rename(&tmp, &final_path)?;
                Ok(written)
            });

        match outcome {
            Ok(written) => {
                let secs = started.elapsed().as_secs_f64();
                self.monitor
                    .finish_transfer(&req.movie, &filename, written, secs);
                tracing::info!(
                    movie = %req.movie,
                    bytes = written,
                    "finished {} in {:.1}s",
                    filename,
                    secs
                );
                Ok(final_path)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&tmp) {
                    if rm.kind() != io::ErrorKind::NotFound {
                        tracing::debug!("could not remove {}: {}", tmp.display(), rm);
                    }
                }
                self.monitor.purge_transfer(&req.movie, &filename);
                Err(e)
            }
        }
    }

    /// GETs `url` into `tmp`; returns bytes written.
    fn stream(&self, url: &str, tmp: &Path, movie: &str, filename: &str) -> Result<u64, TransferError> {
        let file = fs::File::create(tmp)?;
        let mut writer = BufWriter::with_capacity(self.options.chunk_size.max(16 * 1024), file);

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.buffer_size(self.options.chunk_size.max(16 * 1024))?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.useragent(&self.options.user_agent)?;

        let total = Cell::new(0u64);
        let written = Cell::new(0u64);
        let write_error: RefCell<Option<io::Error>> = RefCell::new(None);
        let started = Instant::now();
        let window = Cell::new((started, 0u64));
        let speed = Cell::new(0.0f64);

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if data.starts_with(b"HTTP/") {
                    total.set(0);
                } else if let Some(len) = content_length(data) {
                    total.set(len);
                }
                true
            })?;
            transfer.write_function(|data| {
                if self.monitor.should_throttle(speed.get()) {
                    std::thread::sleep(THROTTLE_PAUSE);
                }
                if let Err(e) = writer.write_all(data) {
                    *write_error.borrow_mut() = Some(e);
                    return Ok(0);
                }
                let done = written.get() + data.len() as u64;
                written.set(done);

                let now = Instant::now();
                let (window_start, window_bytes) = window.get();
                let window_secs = now.duration_since(window_start).as_secs_f64();
                if window_secs >= SPEED_WINDOW.as_secs_f64() {
                    speed.set((done - window_bytes) as f64 / BYTES_PER_MB / window_secs);
                    window.set((now, done));
                } else if window_bytes == 0 {
                    let secs = now.duration_since(started).as_secs_f64().max(1e-3);
                    speed.set(done as f64 / BYTES_PER_MB / secs);
                }
                self.monitor
                    .update_transfer(movie, filename, done, total.get(), speed.get());
                Ok(data.len())
            })?;
            transfer.perform()
        };

        if let Some(e) = write_error.into_inner() {
            return Err(TransferError::Storage(e));
        }
        performed?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }

        let received = written.get();
        let expected = total.get();
        if expected > 0 && received != expected {
            return Err(TransferError::PartialTransfer { expected, received });
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(received)
    }
}

impl FileFetcher for Transfer {
    fn fetch(&self, req: &TransferRequest) -> Option<PathBuf> {
        self.run(req)
    }
}

/// Parses a `Content-Length` header line.
fn content_length(line: &[u8]) -> Option<u64> {
    let line = str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}
