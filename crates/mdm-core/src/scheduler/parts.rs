//! Per-variant part scheduling.
//!
//! Resolves every mirror of a variant, groups them by archive part, and runs
//! one thread per part. Within a part, mirrors are tried best-first until one
//! transfer succeeds. The variant succeeds only if every part does.

use crate::classify::{classify_link, part_number, PriorityTable};
use crate::finish::FolderFinisher;
use crate::model::{first_missing_part, group_by_part, PartGroup, QualityVariant, ResolvedMirror};
use crate::monitor::{ProgressMonitor, TransferLabels};
use crate::resolver::MirrorResolver;
use crate::transfer::{FileFetcher, TransferRequest};
use crate::url_model::{sanitize_filename, sanitize_folder_name};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Why a variant attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantFailure {
    /// The release carries no mirror URLs.
    NoLinks,
    /// No mirror could be unlocked.
    NoMirrorsResolved,
    /// No mirror of this part could be unlocked, although a higher part was.
    PartUnresolved { part: u32 },
    /// Every mirror of this part failed (lowest failing part reported).
    PartExhausted { part: u32 },
}

impl fmt::Display for VariantFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantFailure::NoLinks => write!(f, "no mirror links"),
            VariantFailure::NoMirrorsResolved => write!(f, "no mirror could be resolved"),
            VariantFailure::PartUnresolved { part } => {
                write!(f, "no mirror could be resolved for part {}", part)
            }
            VariantFailure::PartExhausted { part } => {
                write!(f, "all mirrors failed for part {}", part)
            }
        }
    }
}

impl std::error::Error for VariantFailure {}

/// Folder name and monitor key for a movie variant: `"<title> [<format>]"`.
pub fn folder_label(title: &str, format: &str) -> String {
    format!("{} [{}]", sanitize_folder_name(title), sanitize_filename(format))
}

pub struct PartScheduler {
    resolver: Arc<dyn MirrorResolver>,
    fetcher: Arc<dyn FileFetcher>,
    priorities: PriorityTable,
    download_dir: PathBuf,
    monitor: Arc<ProgressMonitor>,
    finisher: Option<Arc<dyn FolderFinisher>>,
}

impl PartScheduler {
    pub fn new(
        resolver: Arc<dyn MirrorResolver>,
        fetcher: Arc<dyn FileFetcher>,
        priorities: PriorityTable,
        download_dir: PathBuf,
        monitor: Arc<ProgressMonitor>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            priorities,
            download_dir,
            monitor,
            finisher: None,
        }
    }

    pub fn with_finisher(mut self, finisher: Arc<dyn FolderFinisher>) -> Self {
        self.finisher = Some(finisher);
        self
    }

    /// Unlocks every mirror of the variant; failed mirrors are dropped.
    pub fn resolve_variant(&self, variant: &QualityVariant) -> Vec<ResolvedMirror> {
        variant
            .mirror_urls()
            .into_iter()
            .enumerate()
            .filter_map(|(position, url)| {
                let unlocked = self.resolver.resolve(url)?;
                let link = classify_link(url, position, &self.priorities);
                Some(ResolvedMirror {
                    part: part_number(&unlocked.filename),
                    link,
                    direct_url: unlocked.direct_url,
                    filename: unlocked.filename,
                    service: unlocked.service,
                })
            })
            .collect()
    }

    /// Downloads every part of `variant` into `<download_dir>/<title> [<format>]`.
    ///
    /// Parts that completed stay on disk when another part fails; a later
    /// attempt skips them.
    pub fn run_variant(&self, title: &str, variant: &QualityVariant) -> Result<PathBuf, VariantFailure> {
        let urls = variant.mirror_urls();
        if urls.is_empty() {
            return Err(VariantFailure::NoLinks);
        }
        tracing::info!(movie = title, format = %variant.format, "resolving {} mirrors", urls.len());

        let groups = group_by_part(self.resolve_variant(variant));
        if groups.is_empty() {
            return Err(VariantFailure::NoMirrorsResolved);
        }
        if let Some(part) = first_missing_part(&groups) {
            tracing::warn!(movie = title, format = %variant.format, part, "part has no resolved mirror");
            return Err(VariantFailure::PartUnresolved { part });
        }

        let label = folder_label(title, &variant.format);
        let folder = self.download_dir.join(&label);
        tracing::info!(movie = %label, parts = groups.len(), "starting part transfers");

        let outcome = self.download_parts(&folder, &label, &variant.format, &groups);
        self.monitor.release_movie(&label);
        outcome?;

        if let Some(finisher) = &self.finisher {
            if let Err(e) = finisher.finish(&folder, title, &variant.format) {
                tracing::warn!(movie = %label, "post-processing failed: {:#}", e);
            }
        }
        Ok(folder)
    }

    fn download_parts(
        &self,
        folder: &Path,
        label: &str,
        format: &str,
        groups: &[PartGroup],
    ) -> Result<(), VariantFailure> {
        let results: Vec<(u32, bool)> = thread::scope(|s| {
            let handles: Vec<_> = groups
                .iter()
                .map(|group| {
                    let handle = s.spawn(move || self.download_part(folder, label, format, group));
                    (group.part, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(part, handle)| {
                    let ok = handle.join().unwrap_or_else(|_| {
                        tracing::error!(movie = label, part, "part thread panicked");
                        false
                    });
                    (part, ok)
                })
                .collect()
        });

        match results.iter().find(|(_, ok)| !ok) {
            Some((part, _)) => Err(VariantFailure::PartExhausted { part: *part }),
            None => Ok(()),
        }
    }

    /// Tries the part's mirrors in order; first success wins.
    fn download_part(&self, folder: &Path, label: &str, format: &str, group: &PartGroup) -> bool {
        for mirror in &group.mirrors {
            let req = TransferRequest {
                url: mirror.direct_url.clone(),
                dest_dir: folder.to_path_buf(),
                filename: Some(mirror.filename.clone()),
                movie: label.to_string(),
                labels: TransferLabels {
                    host: mirror.link.host.clone(),
                    service: mirror.service.label().to_string(),
                    format: format.to_string(),
                },
            };
            if self.fetcher.fetch(&req).is_some() {
                tracing::debug!(movie = label, part = group.part, host = %mirror.link.host, "part complete");
                return true;
            }
            tracing::warn!(
                movie = label,
                part = group.part,
                host = %mirror.link.host,
                "mirror failed, trying next"
            );
        }
        tracing::warn!(movie = label, part = group.part, "no mirror left for part");
        false
    }
}
