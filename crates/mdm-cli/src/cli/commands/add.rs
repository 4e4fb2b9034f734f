//! `mdm add-movie` and `mdm add-release`: manual catalogue entry.

use anyhow::{Context, Result};
use mdm_core::quality::QualityTier;
use mdm_core::store::{NewRelease, ReleaseDb};
use std::path::Path;

pub async fn run_add_movie(db: &ReleaseDb, title: &str) -> Result<()> {
    let id = db.find_or_add_movie(title).await?;
    println!("{id}");
    Ok(())
}

/// Joins the non-blank lines of a links file, one URL per line.
fn read_links(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read links file {}", path.display()))?;
    let links: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if links.is_empty() {
        anyhow::bail!("links file {} has no links", path.display());
    }
    Ok(links.join("\n"))
}

pub async fn run_add_release(
    db: &ReleaseDb,
    movie_id: i64,
    format: &str,
    thread: &str,
    links_file: &Path,
    title: Option<&str>,
) -> Result<()> {
    if QualityTier::parse(format).is_none() {
        tracing::warn!(format, "unknown format, release will never be downloaded");
        eprintln!("warning: unknown format {format:?} (expected x265, 1080p, m1080p or 2160p)");
    }
    let links = read_links(links_file)?;
    let release = NewRelease {
        movie_id,
        thread_id: thread,
        format,
        original_title: title.unwrap_or(thread),
        links: Some(&links),
    };
    match db.add_release(&release).await? {
        Some(id) => println!("Added release {id} ({format}, {} links)", links.lines().count()),
        None if db.set_links(thread, &links).await? => {
            println!("Thread {thread} already known; links updated")
        }
        None => println!("Thread {thread} already known; nothing changed"),
    }
    Ok(())
}
