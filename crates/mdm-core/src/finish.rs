//! Post-processing of a completed variant folder.
//!
//! [`ArchiveCleanup`] extracts the first archive volume when no video file is
//! present yet, then deletes archive leftovers once a video exists.

use crate::classify::part_number;
use crate::config::FinishConfig;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

const VIDEO_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avi"];
const ARCHIVE_EXTENSIONS: [&str; 4] = [".rar", ".zip", ".7z", ".001"];

/// Runs once per successful variant, after every part is on disk.
pub trait FolderFinisher: Send + Sync {
    fn finish(&self, folder: &Path, title: &str, format: &str) -> Result<()>;
}

fn re_leftover() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)(\.(rar|zip|7z|[rz]\d{2}|\d{3})|\.part)$").expect("compile leftover regex")
    })
}

fn is_video(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| e.eq_ignore_ascii_case(v)))
}

/// First volume of an archive set (`x.rar`, `x.part1.rar`, `x.7z.001`, `x.zip`).
fn is_first_volume(name: &str) -> bool {
    let lower = name.to_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) && part_number(&lower) <= 1
}

fn is_leftover(name: &str) -> bool {
    !is_video(name) && re_leftover().is_match(name)
}

fn file_names(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("read {}", folder.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Extract-then-clean finisher driven by an external extractor (`7z` by default).
#[derive(Debug, Clone)]
pub struct ArchiveCleanup {
    extractor: PathBuf,
    password: Option<String>,
}

impl ArchiveCleanup {
    pub fn new(extractor: impl Into<PathBuf>, password: Option<String>) -> Self {
        Self {
            extractor: extractor.into(),
            password,
        }
    }

    pub fn from_config(cfg: &FinishConfig) -> Self {
        Self::new(&cfg.extractor, cfg.archive_password.clone())
    }

    fn extract(&self, archive: &Path, folder: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.extractor);
        cmd.arg("x")
            .arg(archive)
            .arg(format!("-o{}", folder.display()))
            .arg("-y");
        if let Some(pw) = self.password.as_deref().filter(|p| !p.is_empty()) {
            cmd.arg(format!("-p{pw}"));
        }
        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("run {}", self.extractor.display()))?;
        if !status.success() {
            anyhow::bail!("{} exited with {} on {}", self.extractor.display(), status, archive.display());
        }
        Ok(())
    }
}

impl FolderFinisher for ArchiveCleanup {
    fn finish(&self, folder: &Path, title: &str, format: &str) -> Result<()> {
        let names = file_names(folder)?;
        let archive = names.iter().find(|n| is_first_volume(n));
        let mut video = names.iter().find(|n| is_video(n)).cloned();

        if let (Some(archive), None) = (archive, &video) {
            tracing::info!(movie = title, format, "extracting {}", archive);
            self.extract(&folder.join(archive), folder)?;
            video = file_names(folder)?.into_iter().find(|n| is_video(n));
        }

        let Some(video) = video else {
            anyhow::bail!("no video file in {}", folder.display());
        };

        let mut removed = 0usize;
        for name in file_names(folder)?.iter().filter(|n| is_leftover(n)) {
            match fs::remove_file(folder.join(name)) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("could not remove {}: {}", name, e),
            }
        }
        tracing::info!(movie = title, format, removed, "folder ready: {}", video);
        Ok(())
    }
}
