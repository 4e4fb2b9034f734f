//! CLI for the MDM movie release downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mdm_core::config::{self, MdmConfig};
use mdm_core::store::ReleaseDb;
use std::path::PathBuf;

use commands::{
    run_add_movie, run_add_release, run_orchestrator, run_pending, run_recent, run_status,
};

/// Top-level CLI for the MDM downloader.
#[derive(Debug, Parser)]
#[command(name = "mdm")]
#[command(about = "MDM: unlocks and downloads movie releases by best available quality", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a movie and print its id.
    AddMovie {
        /// Movie title, also used as the download folder name.
        title: String,
    },

    /// Add a release (one quality variant) for an existing movie.
    AddRelease {
        /// Movie id from `add-movie`.
        movie_id: i64,
        /// Quality format: x265, 1080p, m1080p or 2160p.
        format: String,
        /// Source thread id; releases are unique per thread.
        #[arg(long)]
        thread: String,
        /// File with one mirror link per line.
        #[arg(long, value_name = "PATH")]
        links_file: PathBuf,
        /// Original release title (defaults to the thread id).
        #[arg(long)]
        title: Option<String>,
    },

    /// List releases waiting to be downloaded.
    Pending,

    /// List the most recently added releases.
    Recent {
        #[arg(long, default_value = "12", value_name = "N")]
        limit: u32,
    },

    /// Download pending releases.
    Run {
        /// Keep running, sleeping `cycle_interval_secs` between cycles.
        #[arg(long = "loop")]
        looping: bool,
        /// Do not serve the dashboard API.
        #[arg(long)]
        no_dashboard: bool,
    },

    /// Show live progress of a running instance.
    Status {
        /// Dashboard address (defaults to `dashboard_addr` from the config).
        #[arg(long)]
        addr: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(download_dir = %cfg.download_dir.display(), "loaded config");

        match cli.command {
            CliCommand::Status { addr } => {
                let addr = addr.unwrap_or_else(|| cfg.dashboard_addr.clone());
                run_status(&addr).await
            }
            command => {
                let db = ReleaseDb::open_default().await?;
                command.run_with_store(&db, &cfg).await
            }
        }
    }

    async fn run_with_store(self, db: &ReleaseDb, cfg: &MdmConfig) -> Result<()> {
        match self {
            CliCommand::AddMovie { title } => run_add_movie(db, &title).await?,
            CliCommand::AddRelease {
                movie_id,
                format,
                thread,
                links_file,
                title,
            } => {
                run_add_release(db, movie_id, &format, &thread, &links_file, title.as_deref())
                    .await?
            }
            CliCommand::Pending => run_pending(db).await?,
            CliCommand::Recent { limit } => run_recent(db, limit).await?,
            CliCommand::Run {
                looping,
                no_dashboard,
            } => run_orchestrator(db, cfg, looping, !no_dashboard).await?,
            CliCommand::Status { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
