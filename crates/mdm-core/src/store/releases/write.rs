//! Release write operations: insert movies/releases, attach links, mark done.

use anyhow::{Context, Result};

use super::super::db::{unix_timestamp, ReleaseDb};
use super::super::types::NewRelease;
use crate::model::{MovieId, ReleaseId};
use crate::quality::QualityTier;

impl ReleaseDb {
    pub async fn add_movie(&self, title: &str) -> Result<MovieId> {
        let title = title.trim();
        anyhow::ensure!(!title.is_empty(), "movie title must not be empty");
        let id = sqlx::query("INSERT INTO movies (title, created_at) VALUES (?1, ?2)")
            .bind(title)
            .bind(unix_timestamp())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    /// Returns the existing movie with this title (case-insensitive) or inserts it.
    pub async fn find_or_add_movie(&self, title: &str) -> Result<MovieId> {
        match self.find_movie(title).await? {
            Some(id) => Ok(id),
            None => self.add_movie(title).await,
        }
    }

    /// Inserts a release; `None` if one already exists for the same thread.
    pub async fn add_release(&self, release: &NewRelease<'_>) -> Result<Option<ReleaseId>> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO releases (
                movie_id, thread_id, format, links, original_title, downloaded, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(release.movie_id)
        .bind(release.thread_id)
        .bind(release.format)
        .bind(release.links)
        .bind(release.original_title)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert release for thread {}", release.thread_id))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    /// Replaces the mirror list of a thread's release. Returns false if the thread is unknown.
    pub async fn set_links(&self, thread_id: &str, links: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE releases SET links = ?1 WHERE thread_id = ?2")
            .bind(links)
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks `tier` and every tier it subsumes as downloaded for the movie.
    /// Returns the number of releases updated.
    pub async fn mark_cascade(&self, movie_id: MovieId, tier: QualityTier) -> Result<u64> {
        let formats = tier.subsumed();
        let placeholders = (0..formats.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE releases SET downloaded = 1 WHERE movie_id = ?1 AND LOWER(format) IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(movie_id);
        for f in formats {
            query = query.bind(f.tag());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
