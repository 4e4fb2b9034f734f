//! Release read operations: pending work, repair list, recent releases.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::ReleaseDb;
use super::super::types::{LinklessRelease, ReleaseRecord, MIN_LINKS_LEN};
use crate::model::{MovieId, MovieJob, QualityVariant};

const RECORD_COLUMNS: &str = r#"
    r.id, r.movie_id, m.title AS movie_title, r.thread_id, r.format, r.links,
    r.original_title, r.downloaded, r.created_at
"#;

fn record_from_row(row: &SqliteRow) -> ReleaseRecord {
    ReleaseRecord {
        id: row.get("id"),
        movie_id: row.get("movie_id"),
        movie_title: row.get("movie_title"),
        thread_id: row.get("thread_id"),
        format: row.get("format"),
        links: row.get("links"),
        original_title: row.get("original_title"),
        downloaded: row.get("downloaded"),
        created_at: row.get("created_at"),
    }
}

impl ReleaseDb {
    /// Movie id by title, case-insensitive.
    pub async fn find_movie(&self, title: &str) -> Result<Option<MovieId>> {
        let row = sqlx::query("SELECT id FROM movies WHERE LOWER(title) = LOWER(?1) ORDER BY id LIMIT 1")
            .bind(title.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    /// Releases not yet downloaded whose links look usable, grouped by movie.
    pub async fn pending_releases(&self) -> Result<Vec<ReleaseRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM releases r
            JOIN movies m ON r.movie_id = m.id
            WHERE r.downloaded = 0
              AND r.links IS NOT NULL
              AND length(r.links) > ?1
            ORDER BY r.movie_id ASC, r.id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(MIN_LINKS_LEN)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Pending releases as one job per movie, movies in id order.
    pub async fn pending_jobs(&self) -> Result<Vec<MovieJob>> {
        let mut jobs: Vec<MovieJob> = Vec::new();
        for rec in self.pending_releases().await? {
            let variant = QualityVariant {
                release_id: rec.id,
                format: rec.format,
                links: rec.links.unwrap_or_default(),
                original_title: rec.original_title,
            };
            match jobs.last_mut() {
                Some(job) if job.movie_id == rec.movie_id => job.variants.push(variant),
                _ => jobs.push(MovieJob {
                    movie_id: rec.movie_id,
                    title: rec.movie_title,
                    variants: vec![variant],
                }),
            }
        }
        Ok(jobs)
    }

    /// Not-downloaded releases whose links are missing or too short to be real.
    pub async fn releases_without_links(&self) -> Result<Vec<LinklessRelease>> {
        let rows = sqlx::query(
            r#"
            SELECT thread_id, original_title
            FROM releases
            WHERE downloaded = 0
              AND (links IS NULL OR length(links) <= ?1)
            ORDER BY id ASC
            "#,
        )
        .bind(MIN_LINKS_LEN)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| LinklessRelease {
                thread_id: row.get("thread_id"),
                original_title: row.get("original_title"),
            })
            .collect())
    }

    /// Most recently added releases, newest first.
    pub async fn latest_releases(&self, limit: u32) -> Result<Vec<ReleaseRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM releases r
            JOIN movies m ON r.movie_id = m.id
            ORDER BY r.id DESC
            LIMIT ?1
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Formats of a movie already marked downloaded.
    #[cfg(test)]
    pub(crate) async fn downloaded_formats(&self, movie_id: MovieId) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT format FROM releases WHERE movie_id = ?1 AND downloaded = 1 ORDER BY format",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("format")).collect())
    }
}
