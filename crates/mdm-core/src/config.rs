//! Orchestrator configuration (`~/.config/mdm/config.toml`).

use crate::classify::DEFAULT_PREFERRED_DOMAINS;
use crate::resolver::{UnlockService, DEBRIDLINK_ADD_URL, REALDEBRID_UNRESTRICT_URL};
use crate::throttle::{parse_time_of_day, ThrottleWindow};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Time-of-day bandwidth shaping (optional `[throttle]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub enabled: bool,
    /// Ceiling in MB/s while the window is active; 0 disables shaping.
    pub limit_mb: f64,
    /// Window start, `HH:MM[:SS]`.
    pub start: String,
    /// Window end (exclusive); may be earlier than `start` to wrap past midnight.
    pub end: String,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit_mb: 0.0,
            start: "08:00".to_string(),
            end: "20:00".to_string(),
        }
    }
}

impl ThrottleConfig {
    pub fn window(&self) -> Result<ThrottleWindow> {
        let start = parse_time_of_day(&self.start)
            .with_context(|| format!("invalid throttle start time {:?}", self.start))?;
        let end = parse_time_of_day(&self.end)
            .with_context(|| format!("invalid throttle end time {:?}", self.end))?;
        Ok(ThrottleWindow::new(start, end))
    }
}

/// Unlock services and mirror ranking (optional `[resolver]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Service tried first for hosters without a route.
    pub preferred_service: UnlockService,
    pub realdebrid_token: Option<String>,
    pub debridlink_token: Option<String>,
    pub realdebrid_url: String,
    pub debridlink_url: String,
    pub timeout_secs: u64,
    /// Mirror ranking, best first. Matched against hostnames, labels and suffixes.
    pub preferred_domains: Vec<String>,
    /// Extra hoster → service routes, consulted before the built-in table.
    pub hoster_routes: BTreeMap<String, UnlockService>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            preferred_service: UnlockService::RealDebrid,
            realdebrid_token: None,
            debridlink_token: None,
            realdebrid_url: REALDEBRID_UNRESTRICT_URL.to_string(),
            debridlink_url: DEBRIDLINK_ADD_URL.to_string(),
            timeout_secs: 30,
            preferred_domains: DEFAULT_PREFERRED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            hoster_routes: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    /// Token for `service`, if configured and not blank.
    pub fn token(&self, service: UnlockService) -> Option<&str> {
        let token = match service {
            UnlockService::RealDebrid => &self.realdebrid_token,
            UnlockService::DebridLink => &self.debridlink_token,
        };
        token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Services that can be called at all.
    pub fn usable_services(&self) -> Vec<UnlockService> {
        [UnlockService::RealDebrid, UnlockService::DebridLink]
            .into_iter()
            .filter(|s| self.token(*s).is_some())
            .collect()
    }
}

/// Post-processing of completed variant folders (optional `[finish]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishConfig {
    pub enabled: bool,
    /// Extractor binary invoked as `<extractor> x <archive> -o<folder> -y`.
    pub extractor: String,
    pub archive_password: Option<String>,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extractor: "7z".to_string(),
            archive_password: None,
        }
    }
}

/// Global configuration loaded from `~/.config/mdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdmConfig {
    /// Root of the per-variant download folders.
    pub download_dir: PathBuf,
    /// Maximum simultaneous file transfers across all movies (runtime adjustable).
    pub max_parallel_downloads: usize,
    /// Movies orchestrated at once.
    pub movie_workers: usize,
    /// Sleep between cycles in `run --loop`.
    pub cycle_interval_secs: u64,
    /// Receive buffer per transfer.
    pub chunk_size_bytes: usize,
    /// Finished transfers kept in the dashboard history.
    pub history_limit: usize,
    pub dashboard_addr: String,
    pub throttle: ThrottleConfig,
    pub resolver: ResolverConfig,
    pub finish: FinishConfig,
}

impl Default for MdmConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_parallel_downloads: 10,
            movie_workers: 5,
            cycle_interval_secs: 4 * 60 * 60,
            chunk_size_bytes: 1024 * 1024,
            history_limit: 100,
            dashboard_addr: "0.0.0.0:8000".to_string(),
            throttle: ThrottleConfig::default(),
            resolver: ResolverConfig::default(),
            finish: FinishConfig::default(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Downloads")
        .join("mdm")
}

impl MdmConfig {
    /// Applies `REALDEBRID_API_TOKEN`, `DEBRIDLINK_API_KEY`, `DOWNLOAD_DIR`
    /// and `RAR_PASSWORD` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = get("REALDEBRID_API_TOKEN") {
            self.resolver.realdebrid_token = Some(token);
        }
        if let Some(token) = get("DEBRIDLINK_API_KEY") {
            self.resolver.debridlink_token = Some(token);
        }
        if let Some(dir) = get("DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(pw) = get("RAR_PASSWORD") {
            self.finish.archive_password = Some(pw);
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overrides are applied on top and never written back.
pub fn load_or_init() -> Result<MdmConfig> {
    let path = config_path()?;
    let mut cfg = if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?
    } else {
        let default_cfg = MdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    };
    cfg.apply_env();
    Ok(cfg)
}
