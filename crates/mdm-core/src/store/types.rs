//! Row types returned by the release store.

use crate::model::{MovieId, ReleaseId};

/// Minimum length of a links field for the release to count as downloadable.
pub const MIN_LINKS_LEN: i64 = 10;

/// A release as stored, joined with its movie title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub id: ReleaseId,
    pub movie_id: MovieId,
    pub movie_title: String,
    pub thread_id: String,
    pub format: String,
    pub links: Option<String>,
    pub original_title: String,
    pub downloaded: bool,
    pub created_at: i64,
}

/// Fields for inserting a release.
#[derive(Debug, Clone)]
pub struct NewRelease<'a> {
    pub movie_id: MovieId,
    pub thread_id: &'a str,
    pub format: &'a str,
    pub original_title: &'a str,
    pub links: Option<&'a str>,
}

/// Not-yet-downloaded release whose links are missing or too short; needs a re-scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinklessRelease {
    pub thread_id: String,
    pub original_title: String,
}
