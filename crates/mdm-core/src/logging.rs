//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use crate::config::MdmConfig;
use crate::throttle::ThrottleWindow;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,mdm=debug,mdm_core=debug";

/// Writer that is either the log file or stderr (used when the file handle cannot be cloned).
enum LogSink {
    File(fs::File),
    Stderr,
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogSink::File)
            .unwrap_or(LogSink::Stderr)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the orchestrator log: `~/.local/state/mdm/mdm.log`.
pub fn log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdm")?;
    xdg_dirs
        .place_state_file("mdm.log")
        .context("create mdm state directory")
}

/// Initialize structured logging to the state-dir log file.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging() -> Result<()> {
    let path = log_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(FileMakeWriter(file)))
        .with_ansi(false)
        .init();

    tracing::info!("mdm logging initialized at {}", path.display());
    Ok(())
}

/// Initialize logging to stderr only. Used when `init_logging` fails so the CLI keeps running.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

/// One-line description of the effective run configuration. Never includes tokens.
fn startup_summary(cfg: &MdmConfig, window: &ThrottleWindow) -> String {
    let services: Vec<&str> = cfg
        .resolver
        .usable_services()
        .into_iter()
        .map(|s| s.label())
        .collect();
    let throttle = if cfg.throttle.enabled && cfg.throttle.limit_mb > 0.0 {
        format!(
            "{} MB/s {}-{}",
            cfg.throttle.limit_mb,
            window.start.format("%H:%M"),
            window.end.format("%H:%M")
        )
    } else {
        "off".to_string()
    };
    format!(
        "download_dir={} max_parallel={} movie_workers={} throttle={} services=[{}]",
        cfg.download_dir.display(),
        cfg.max_parallel_downloads,
        cfg.movie_workers,
        throttle,
        services.join(",")
    )
}

/// Logs where downloads go and how they are shaped, once per `run`.
pub fn log_startup(cfg: &MdmConfig, window: &ThrottleWindow) {
    tracing::info!("starting orchestrator: {}", startup_summary(cfg, window));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_writer_appends_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdm.log");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let make = FileMakeWriter(file);
        make.make_writer().write_all(b"first\n").unwrap();
        make.make_writer().write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn summary_lists_usable_services_without_tokens() {
        let mut cfg = MdmConfig::default();
        cfg.download_dir = PathBuf::from("/srv/movies");
        cfg.throttle.limit_mb = 5.0;
        cfg.resolver.realdebrid_token = Some("secret-rd".into());
        cfg.resolver.debridlink_token = Some(" ".into());

        let line = startup_summary(&cfg, &ThrottleWindow::default());
        assert_eq!(
            line,
            "download_dir=/srv/movies max_parallel=10 movie_workers=5 throttle=5 MB/s 08:00-20:00 services=[RD]"
        );
        assert!(!line.contains("secret"));
    }

    #[test]
    fn summary_reports_disabled_throttle() {
        let mut cfg = MdmConfig::default();
        cfg.throttle.enabled = false;
        cfg.throttle.limit_mb = 5.0;
        assert!(startup_summary(&cfg, &ThrottleWindow::default()).contains("throttle=off"));
    }
}
