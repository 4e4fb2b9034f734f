//! Live orchestrator state shared by transfers and the dashboard.
//!
//! All maps sit behind one mutex and are only touched through methods here;
//! readers get an owned [`MonitorSnapshot`]. The monitor also owns the
//! transfer gate and the throttle policy so that dynamic configuration
//! changes go through a single lock.

use crate::config::MdmConfig;
use crate::gate::ConcurrencyGate;
use crate::throttle::SpeedThrottle;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Downloading,
    Completed,
}

/// Display labels attached to a transfer when it starts.
#[derive(Debug, Clone, Default)]
pub struct TransferLabels {
    pub host: String,
    pub service: String,
    pub format: String,
}

/// Per-file progress as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferState {
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Percent, one decimal; 0 while the size is unknown.
    pub progress: f64,
    /// Instantaneous MB/s.
    pub speed_mb: f64,
    pub status: TransferStatus,
    pub host: String,
    pub service: String,
    pub format: String,
}

/// Settings an operator may change while the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfig {
    pub max_parallel: usize,
    pub throttle_enabled: bool,
    pub throttle_limit_mb: f64,
}

/// One completed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishEvent {
    pub movie: String,
    pub file: String,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub avg_speed_mb: f64,
    pub finished_at: DateTime<Local>,
}

/// Owned copy of the monitor, served by `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// movie folder → file → progress
    pub downloads: BTreeMap<String, BTreeMap<String, TransferState>>,
    /// Sum of the speeds of transfers still downloading, MB/s.
    pub total_speed: f64,
    pub transfers_in_flight: usize,
    pub config: DynamicConfig,
    /// Newest first.
    pub history: Vec<FinishEvent>,
    pub completed_titles: Vec<String>,
}

#[derive(Debug)]
struct MonitorState {
    active: BTreeMap<String, BTreeMap<String, TransferState>>,
    history: VecDeque<FinishEvent>,
    completed: BTreeSet<String>,
    config: DynamicConfig,
}

#[derive(Debug)]
pub struct ProgressMonitor {
    state: Mutex<MonitorState>,
    gate: ConcurrencyGate,
    throttle: SpeedThrottle,
    history_limit: usize,
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

impl ProgressMonitor {
    pub fn new(config: DynamicConfig, throttle: SpeedThrottle, history_limit: usize) -> Self {
        let config = DynamicConfig {
            max_parallel: config.max_parallel.max(1),
            ..config
        };
        Self {
            state: Mutex::new(MonitorState {
                active: BTreeMap::new(),
                history: VecDeque::new(),
                completed: BTreeSet::new(),
                config,
            }),
            gate: ConcurrencyGate::new(config.max_parallel),
            throttle,
            history_limit: history_limit.max(1),
        }
    }

    pub fn from_config(cfg: &MdmConfig, throttle: SpeedThrottle) -> Self {
        Self::new(
            DynamicConfig {
                max_parallel: cfg.max_parallel_downloads,
                throttle_enabled: cfg.throttle.enabled,
                throttle_limit_mb: cfg.throttle.limit_mb,
            },
            throttle,
            cfg.history_limit,
        )
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gate every transfer must hold a slot of while its connection is open.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn start_transfer(&self, movie: &str, file: &str, labels: TransferLabels) {
        let mut st = self.lock();
        st.active.entry(movie.to_string()).or_default().insert(
            file.to_string(),
            TransferState {
                bytes_done: 0,
                total_bytes: 0,
                progress: 0.0,
                speed_mb: 0.0,
                status: TransferStatus::Downloading,
                host: labels.host,
                service: labels.service,
                format: labels.format,
            },
        );
    }

    pub fn update_transfer(&self, movie: &str, file: &str, bytes_done: u64, total_bytes: u64, speed_mb: f64) {
        let mut st = self.lock();
        let Some(entry) = st.active.get_mut(movie).and_then(|m| m.get_mut(file)) else {
            return;
        };
        entry.bytes_done = bytes_done;
        entry.total_bytes = total_bytes;
        entry.progress = if total_bytes > 0 {
            round_to(bytes_done as f64 * 100.0 / total_bytes as f64, 1).min(100.0)
        } else {
            0.0
        };
        entry.speed_mb = round_to(speed_mb, 2);
    }

    /// Marks the file completed and records it in the history.
    pub fn finish_transfer(&self, movie: &str, file: &str, size_bytes: u64, duration_secs: f64) {
        let avg_speed_mb = if duration_secs > 0.0 {
            round_to(size_bytes as f64 / BYTES_PER_MB / duration_secs, 2)
        } else {
            0.0
        };
        let mut st = self.lock();
        if let Some(entry) = st.active.get_mut(movie).and_then(|m| m.get_mut(file)) {
            entry.status = TransferStatus::Completed;
            entry.bytes_done = size_bytes;
            entry.total_bytes = entry.total_bytes.max(size_bytes);
            entry.progress = 100.0;
            entry.speed_mb = 0.0;
        }
        st.history.push_front(FinishEvent {
            movie: movie.to_string(),
            file: file.to_string(),
            size_bytes,
            duration_secs: round_to(duration_secs, 1),
            avg_speed_mb,
            finished_at: Local::now(),
        });
        st.history.truncate(self.history_limit);
    }

    /// Drops a failed transfer's entry.
    pub fn purge_transfer(&self, movie: &str, file: &str) {
        let mut st = self.lock();
        if let Some(files) = st.active.get_mut(movie) {
            files.remove(file);
            if files.is_empty() {
                st.active.remove(movie);
            }
        }
    }

    /// Drops every entry for `movie` once its variant attempt is over.
    pub fn release_movie(&self, movie: &str) {
        self.lock().active.remove(movie);
    }

    pub fn mark_completed_title(&self, title: &str) {
        self.lock().completed.insert(title.to_string());
    }

    pub fn is_completed_title(&self, title: &str) -> bool {
        self.lock().completed.contains(title)
    }

    /// Updates the transfer cap and resizes the gate under the monitor lock.
    pub fn set_max_parallel(&self, max_parallel: usize) {
        let mut st = self.lock();
        st.config.max_parallel = max_parallel.max(1);
        self.gate.set_capacity(st.config.max_parallel);
        tracing::info!(max_parallel = st.config.max_parallel, "transfer cap changed");
    }

    pub fn set_throttle(&self, enabled: bool, limit_mb: f64) {
        let mut st = self.lock();
        st.config.throttle_enabled = enabled;
        st.config.throttle_limit_mb = limit_mb.max(0.0);
        tracing::info!(enabled, limit_mb = st.config.throttle_limit_mb, "throttle changed");
    }

    pub fn dynamic_config(&self) -> DynamicConfig {
        self.lock().config
    }

    /// Whether a transfer currently at `speed_mb` should pause before writing.
    pub fn should_throttle(&self, speed_mb: f64) -> bool {
        let cfg = self.dynamic_config();
        self.throttle
            .should_pause(cfg.throttle_enabled, cfg.throttle_limit_mb, speed_mb)
    }

    pub fn downloading_count(&self) -> usize {
        self.lock()
            .active
            .values()
            .flat_map(|files| files.values())
            .filter(|t| t.status == TransferStatus::Downloading)
            .count()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let st = self.lock();
        let total_speed: f64 = st
            .active
            .values()
            .flat_map(|files| files.values())
            .filter(|t| t.status == TransferStatus::Downloading)
            .map(|t| t.speed_mb)
            .sum();
        MonitorSnapshot {
            downloads: st.active.clone(),
            total_speed: round_to(total_speed, 2),
            transfers_in_flight: self.gate.in_use(),
            config: st.config,
            history: st.history.iter().cloned().collect(),
            completed_titles: st.completed.iter().cloned().collect(),
        }
    }
}
