//! Work items flowing from the store through the part scheduler.

use crate::quality::QualityTier;
use crate::resolver::UnlockService;
use std::collections::BTreeMap;

/// Movie identifier (store row id).
pub type MovieId = i64;

/// Release identifier (store row id).
pub type ReleaseId = i64;

/// One raw hoster link with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLink {
    pub url: String,
    /// Normalised hoster domain, empty if the URL has no parseable host.
    pub host: String,
    /// Lower is preferred; `classify::UNRANKED` when no preferred domain matches.
    pub priority: u32,
    /// Position in the variant's raw link list, breaks priority ties.
    pub position: usize,
}

/// A mirror after a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMirror {
    pub link: MirrorLink,
    pub direct_url: String,
    pub filename: String,
    pub service: UnlockService,
    pub part: u32,
}

/// All resolved mirrors for one archive part, best first.
#[derive(Debug, Clone)]
pub struct PartGroup {
    pub part: u32,
    pub mirrors: Vec<ResolvedMirror>,
}

/// Groups resolved mirrors by part number (ascending) and orders each group
/// by `(priority, position)`.
pub fn group_by_part(resolved: Vec<ResolvedMirror>) -> Vec<PartGroup> {
    let mut by_part: BTreeMap<u32, Vec<ResolvedMirror>> = BTreeMap::new();
    for mirror in resolved {
        by_part.entry(mirror.part).or_default().push(mirror);
    }
    by_part
        .into_iter()
        .map(|(part, mut mirrors)| {
            mirrors.sort_by_key(|m| (m.link.priority, m.link.position));
            PartGroup { part, mirrors }
        })
        .collect()
}

/// Lowest part number in `1..=highest` with no group, i.e. a part whose
/// mirrors all failed to resolve. `groups` must be sorted by part.
pub fn first_missing_part(groups: &[PartGroup]) -> Option<u32> {
    let mut expected = 1;
    for group in groups {
        if group.part > expected {
            return Some(expected);
        }
        expected = expected.max(group.part.saturating_add(1));
    }
    None
}

/// One release (forum thread) of a movie in one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityVariant {
    pub release_id: ReleaseId,
    pub format: String,
    /// Newline-separated raw mirror URLs.
    pub links: String,
    pub original_title: String,
}

impl QualityVariant {
    pub fn tier(&self) -> Option<QualityTier> {
        QualityTier::parse(&self.format)
    }

    /// Raw mirror URLs: one per line, trimmed, blanks dropped.
    pub fn mirror_urls(&self) -> Vec<&str> {
        self.links
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Pending work for one movie.
#[derive(Debug, Clone)]
pub struct MovieJob {
    pub movie_id: MovieId,
    pub title: String,
    pub variants: Vec<QualityVariant>,
}

impl MovieJob {
    /// First pending variant of the given tier.
    pub fn variant(&self, tier: QualityTier) -> Option<&QualityVariant> {
        self.variants.iter().find(|v| v.tier() == Some(tier))
    }
}
