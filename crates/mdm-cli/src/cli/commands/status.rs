//! `mdm status`: summary of a running instance, read from its dashboard API.

use anyhow::{Context, Result};
use mdm_core::dashboard;
use mdm_core::monitor::{MonitorSnapshot, TransferStatus};

const HISTORY_SHOWN: usize = 5;

pub async fn run_status(addr: &str) -> Result<()> {
    let addr_owned = addr.to_string();
    let snap = tokio::task::spawn_blocking(move || dashboard::fetch_status(&addr_owned))
        .await
        .context("status task failed")?
        .with_context(|| format!("is `mdm run` serving the dashboard on {addr}?"))?;
    print!("{}", render(&snap));
    Ok(())
}

fn render(snap: &MonitorSnapshot) -> String {
    let mut out = String::new();
    let throttle = if snap.config.throttle_enabled && snap.config.throttle_limit_mb > 0.0 {
        format!("{} MB/s", snap.config.throttle_limit_mb)
    } else {
        "off".to_string()
    };
    out.push_str(&format!(
        "transfers: {}/{}  speed: {:.2} MB/s  throttle: {}\n",
        snap.transfers_in_flight, snap.config.max_parallel, snap.total_speed, throttle
    ));

    for (movie, files) in &snap.downloads {
        out.push_str(&format!("{movie}\n"));
        for (file, t) in files {
            let state = match t.status {
                TransferStatus::Downloading => format!("{:5.1}% {:6.2} MB/s", t.progress, t.speed_mb),
                TransferStatus::Completed => "done".to_string(),
            };
            out.push_str(&format!("  {file}  {state}  [{} via {}]\n", t.host, t.service));
        }
    }

    if !snap.history.is_empty() {
        out.push_str("recent:\n");
        for e in snap.history.iter().take(HISTORY_SHOWN) {
            out.push_str(&format!(
                "  {}  {}  {:.2} MB/s  {}\n",
                e.finished_at.format("%H:%M:%S"),
                e.file,
                e.avg_speed_mb,
                e.movie
            ));
        }
    }
    if !snap.completed_titles.is_empty() {
        out.push_str(&format!("completed: {}\n", snap.completed_titles.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdm_core::monitor::{DynamicConfig, TransferState};
    use std::collections::BTreeMap;

    #[test]
    fn render_lists_transfers_and_throttle() {
        let mut files = BTreeMap::new();
        files.insert(
            "Dune.part1.rar".to_string(),
            TransferState {
                bytes_done: 50,
                total_bytes: 100,
                progress: 50.0,
                speed_mb: 3.25,
                status: TransferStatus::Downloading,
                host: "1fichier.com".into(),
                service: "RD".into(),
                format: "1080p".into(),
            },
        );
        let mut downloads = BTreeMap::new();
        downloads.insert("Dune [1080p]".to_string(), files);
        let snap = MonitorSnapshot {
            downloads,
            total_speed: 3.25,
            transfers_in_flight: 1,
            config: DynamicConfig {
                max_parallel: 10,
                throttle_enabled: true,
                throttle_limit_mb: 5.0,
            },
            history: Vec::new(),
            completed_titles: vec!["Arrival".into()],
        };

        let text = render(&snap);
        assert!(text.starts_with("transfers: 1/10  speed: 3.25 MB/s  throttle: 5 MB/s"));
        assert!(text.contains("Dune [1080p]\n  Dune.part1.rar   50.0%   3.25 MB/s  [1fichier.com via RD]"));
        assert!(text.contains("completed: Arrival"));
    }
}
