//! `mdm run`: orchestrate pending releases, optionally forever.

use anyhow::{Context, Result};
use mdm_core::classify::PriorityTable;
use mdm_core::config::MdmConfig;
use mdm_core::dashboard;
use mdm_core::finish::ArchiveCleanup;
use mdm_core::logging;
use mdm_core::monitor::ProgressMonitor;
use mdm_core::resolver::LinkResolver;
use mdm_core::scheduler::{run_pending, PartScheduler};
use mdm_core::store::ReleaseDb;
use mdm_core::throttle::SpeedThrottle;
use mdm_core::transfer::{Transfer, TransferOptions};
use std::sync::Arc;
use std::time::Duration;

fn build_scheduler(cfg: &MdmConfig, monitor: &Arc<ProgressMonitor>) -> PartScheduler {
    let resolver = LinkResolver::from_config(&cfg.resolver);
    let transfer = Transfer::new(
        Arc::clone(monitor),
        TransferOptions {
            chunk_size: cfg.chunk_size_bytes,
            ..TransferOptions::default()
        },
    );
    let scheduler = PartScheduler::new(
        Arc::new(resolver),
        Arc::new(transfer),
        PriorityTable::new(&cfg.resolver.preferred_domains),
        cfg.download_dir.clone(),
        Arc::clone(monitor),
    );
    if cfg.finish.enabled {
        scheduler.with_finisher(Arc::new(ArchiveCleanup::from_config(&cfg.finish)))
    } else {
        scheduler
    }
}

async fn spawn_dashboard(
    addr: &str,
    monitor: &Arc<ProgressMonitor>,
) -> Option<tokio::task::JoinHandle<Result<()>>> {
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => Some(tokio::spawn(dashboard::serve(listener, Arc::clone(monitor)))),
        Err(e) => {
            tracing::warn!("dashboard disabled, cannot bind {}: {}", addr, e);
            None
        }
    }
}

pub async fn run_orchestrator(
    db: &ReleaseDb,
    cfg: &MdmConfig,
    looping: bool,
    serve_dashboard: bool,
) -> Result<()> {
    if cfg.resolver.usable_services().is_empty() {
        anyhow::bail!(
            "no unlock service token configured (set REALDEBRID_API_TOKEN or DEBRIDLINK_API_KEY)"
        );
    }
    std::fs::create_dir_all(&cfg.download_dir)
        .with_context(|| format!("create download dir {}", cfg.download_dir.display()))?;

    let window = cfg.throttle.window()?;
    logging::log_startup(cfg, &window);
    let throttle = SpeedThrottle::new(window);
    let monitor = Arc::new(ProgressMonitor::from_config(cfg, throttle));
    let scheduler = Arc::new(build_scheduler(cfg, &monitor));

    let dashboard = if serve_dashboard {
        spawn_dashboard(&cfg.dashboard_addr, &monitor).await
    } else {
        None
    };

    let interval = Duration::from_secs(cfg.cycle_interval_secs.max(1));
    let result = loop {
        tracing::info!("starting download cycle");
        let processed = match run_pending(db, scheduler.clone(), Arc::clone(&monitor), cfg.movie_workers).await {
            Ok(n) => n,
            Err(e) if looping => {
                tracing::error!("download cycle failed: {:#}", e);
                0
            }
            Err(e) => break Err(e),
        };
        println!("Processed {processed} movie(s).");

        match db.releases_without_links().await {
            Ok(linkless) if !linkless.is_empty() => {
                tracing::warn!(count = linkless.len(), "releases still need links");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("could not list releases without links: {:#}", e),
        }

        if !looping {
            break Ok(());
        }
        tracing::info!("next cycle in {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break Ok(());
            }
        }
    };

    if let Some(handle) = dashboard {
        handle.abort();
    }
    result
}
