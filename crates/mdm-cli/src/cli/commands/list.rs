//! `mdm pending` and `mdm recent`: release listings.

use anyhow::Result;
use mdm_core::store::{ReleaseDb, ReleaseRecord};

fn link_count(rec: &ReleaseRecord) -> usize {
    rec.links
        .as_deref()
        .map(|l| l.lines().filter(|x| !x.trim().is_empty()).count())
        .unwrap_or(0)
}

fn print_table(records: &[ReleaseRecord]) {
    println!("{:<6} {:<8} {:<6} {:<5} {}", "ID", "FORMAT", "LINKS", "DONE", "MOVIE");
    for r in records {
        println!(
            "{:<6} {:<8} {:<6} {:<5} {}",
            r.id,
            r.format,
            link_count(r),
            if r.downloaded { "yes" } else { "no" },
            r.movie_title
        );
    }
}

pub async fn run_pending(db: &ReleaseDb) -> Result<()> {
    let pending = db.pending_releases().await?;
    if pending.is_empty() {
        println!("No pending releases.");
    } else {
        print_table(&pending);
    }

    let linkless = db.releases_without_links().await?;
    if !linkless.is_empty() {
        println!();
        println!("{} release(s) need links:", linkless.len());
        for r in linkless {
            println!("  thread {}  {}", r.thread_id, r.original_title);
        }
    }
    Ok(())
}

pub async fn run_recent(db: &ReleaseDb, limit: u32) -> Result<()> {
    let recent = db.latest_releases(limit).await?;
    if recent.is_empty() {
        println!("No releases in database.");
    } else {
        print_table(&recent);
    }
    Ok(())
}
