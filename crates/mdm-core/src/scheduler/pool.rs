//! Runs pending movies concurrently, each through the quality state machine.
//!
//! Keeps up to `movie_workers` movies in flight; when one finishes, the next
//! pending movie starts until the list is empty. How many bytes actually flow
//! is bounded separately by the transfer gate.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::monitor::ProgressMonitor;
use crate::store::ReleaseDb;

use super::movie::{process_movie, VariantRunner};

/// Fetches pending work from the store and orchestrates it. Returns the number
/// of movies processed (successful or not).
pub async fn run_pending(
    store: &ReleaseDb,
    runner: Arc<dyn VariantRunner>,
    monitor: Arc<ProgressMonitor>,
    movie_workers: usize,
) -> Result<u32> {
    let max_concurrent = movie_workers.max(1);
    let mut queue: VecDeque<_> = store.pending_jobs().await?.into();
    if queue.is_empty() {
        tracing::info!("no pending releases");
        return Ok(0);
    }
    tracing::info!(movies = queue.len(), workers = max_concurrent, "orchestrating pending movies");

    let mut run_count = 0u32;
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some(job) = queue.pop_front() else {
                break;
            };
            let store = store.clone();
            let runner = Arc::clone(&runner);
            let monitor = Arc::clone(&monitor);
            join_set.spawn(async move { process_movie(job, runner, &store, &monitor).await });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        run_count += 1;
        match res {
            Ok(outcome) if outcome.any_success() => tracing::info!(
                movie = %outcome.title,
                hd = ?outcome.hd.map(|t| t.tag()),
                uhd = outcome.uhd,
                "movie done"
            ),
            Ok(outcome) => tracing::warn!(movie = %outcome.title, "nothing downloaded this cycle"),
            Err(e) => tracing::error!("movie worker join: {}", e),
        }
    }

    Ok(run_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QualityVariant;
    use crate::monitor::DynamicConfig;
    use crate::store::{open_memory, NewRelease};
    use crate::throttle::SpeedThrottle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const LINKS: &str = "https://1fichier.com/?a\nhttps://rapidgator.net/file/b";

    #[derive(Default)]
    struct SlowRunner {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl VariantRunner for SlowRunner {
        fn attempt(&self, title: &str, _variant: &QualityVariant) -> bool {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            self.current.fetch_sub(1, Ordering::SeqCst);
            assert_ne!(title, "panic");
            true
        }
    }

    fn monitor() -> Arc<ProgressMonitor> {
        Arc::new(ProgressMonitor::new(
            DynamicConfig {
                max_parallel: 4,
                throttle_enabled: false,
                throttle_limit_mb: 0.0,
            },
            SpeedThrottle::default(),
            10,
        ))
    }

    #[tokio::test]
    async fn bounded_movie_concurrency() {
        let db = open_memory().await.unwrap();
        for i in 0..5 {
            let movie = db.add_movie(&format!("Movie {i}")).await.unwrap();
            db.add_release(&NewRelease {
                movie_id: movie,
                thread_id: &format!("t{i}"),
                format: "1080p",
                original_title: "",
                links: Some(LINKS),
            })
            .await
            .unwrap();
        }
        let runner = Arc::new(SlowRunner::default());
        let m = monitor();
        let n = run_pending(&db, runner.clone(), Arc::clone(&m), 2).await.unwrap();

        assert_eq!(n, 5);
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
        assert!(db.pending_releases().await.unwrap().is_empty());
        assert_eq!(m.snapshot().completed_titles.len(), 5);
    }

    #[tokio::test]
    async fn panicking_movie_does_not_stop_the_pool() {
        let db = open_memory().await.unwrap();
        for (i, title) in ["panic", "Fine"].iter().enumerate() {
            let movie = db.add_movie(title).await.unwrap();
            db.add_release(&NewRelease {
                movie_id: movie,
                thread_id: &format!("t{i}"),
                format: "x265",
                original_title: "",
                links: Some(LINKS),
            })
            .await
            .unwrap();
        }
        let m = monitor();
        let n = run_pending(&db, Arc::new(SlowRunner::default()), Arc::clone(&m), 1)
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(m.snapshot().completed_titles, vec!["Fine".to_string()]);
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op() {
        let db = open_memory().await.unwrap();
        let n = run_pending(&db, Arc::new(SlowRunner::default()), monitor(), 3)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}
