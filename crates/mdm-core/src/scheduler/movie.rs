//! Per-movie quality selection.
//!
//! HD lane: x265 → 1080p → m1080p, stopping at the first variant that fully
//! downloads. UHD lane: 2160p, attempted whenever present, independent of the
//! HD outcome. Each success is written back to the store as a cascading mark
//! so subsumed tiers are never attempted again.

use crate::model::{MovieId, MovieJob, QualityVariant};
use crate::monitor::ProgressMonitor;
use crate::quality::QualityTier;
use crate::store::ReleaseDb;
use std::sync::Arc;

use super::parts::PartScheduler;

/// Runs one variant to completion on the calling (blocking) thread.
pub trait VariantRunner: Send + Sync {
    fn attempt(&self, title: &str, variant: &QualityVariant) -> bool;
}

impl VariantRunner for PartScheduler {
    fn attempt(&self, title: &str, variant: &QualityVariant) -> bool {
        match self.run_variant(title, variant) {
            Ok(folder) => {
                tracing::info!(movie = title, format = %variant.format, "variant complete in {}", folder.display());
                true
            }
            Err(e) => {
                tracing::warn!(movie = title, format = %variant.format, "variant failed: {}", e);
                false
            }
        }
    }
}

/// What a movie worker achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieOutcome {
    pub movie_id: MovieId,
    pub title: String,
    /// HD tier that completed, if any.
    pub hd: Option<QualityTier>,
    pub uhd: bool,
}

impl MovieOutcome {
    pub fn any_success(&self) -> bool {
        self.hd.is_some() || self.uhd
    }
}

async fn attempt(runner: &Arc<dyn VariantRunner>, title: &str, variant: &QualityVariant) -> bool {
    let runner = Arc::clone(runner);
    let title_owned = title.to_string();
    let variant = variant.clone();
    match tokio::task::spawn_blocking(move || runner.attempt(&title_owned, &variant)).await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::error!(movie = title, "variant worker panicked: {}", e);
            false
        }
    }
}

async fn mark(store: &ReleaseDb, movie_id: MovieId, title: &str, tier: QualityTier) {
    match store.mark_cascade(movie_id, tier).await {
        Ok(n) => tracing::debug!(movie = title, tier = %tier, releases = n, "marked downloaded"),
        Err(e) => tracing::warn!(movie = title, tier = %tier, "could not mark downloaded: {:#}", e),
    }
}

/// Drives both quality lanes for one movie.
pub async fn process_movie(
    job: MovieJob,
    runner: Arc<dyn VariantRunner>,
    store: &ReleaseDb,
    monitor: &ProgressMonitor,
) -> MovieOutcome {
    for v in job.variants.iter().filter(|v| v.tier().is_none()) {
        tracing::debug!(movie = %job.title, format = %v.format, "ignoring unknown format");
    }

    let mut hd = None;
    for tier in QualityTier::HD_ORDER {
        let Some(variant) = job.variant(tier) else {
            continue;
        };
        tracing::info!(movie = %job.title, "trying {}", tier);
        if attempt(&runner, &job.title, variant).await {
            mark(store, job.movie_id, &job.title, tier).await;
            hd = Some(tier);
            break;
        }
    }
    if hd.is_none() && QualityTier::HD_ORDER.iter().any(|t| job.variant(*t).is_some()) {
        tracing::warn!(movie = %job.title, "every HD variant failed");
    }

    let mut uhd = false;
    if let Some(variant) = job.variant(QualityTier::Uhd2160p) {
        tracing::info!(movie = %job.title, "trying {}", QualityTier::Uhd2160p);
        if attempt(&runner, &job.title, variant).await {
            mark(store, job.movie_id, &job.title, QualityTier::Uhd2160p).await;
            uhd = true;
        }
    }

    let outcome = MovieOutcome {
        movie_id: job.movie_id,
        title: job.title,
        hd,
        uhd,
    };
    if outcome.any_success() {
        monitor.mark_completed_title(&outcome.title);
    }
    outcome
}
