//! Source priority ranks from an ordered preferred-domain list.

use crate::url_model::HostTable;

/// Rank of a mirror whose host is not in the preferred list.
pub const UNRANKED: u32 = u32::MAX;

pub const DEFAULT_PREFERRED_DOMAINS: [&str; 7] = [
    "1fichier",
    "katfile",
    "pixeldrain",
    "mega",
    "drive",
    "rapidgator",
    "turbobit",
];

/// Normalised-host → rank lookup, built once from the preferred-domain list
/// (rank = list position, earlier is better).
#[derive(Debug, Clone)]
pub struct PriorityTable {
    ranks: HostTable<u32>,
}

impl PriorityTable {
    pub fn new<S: AsRef<str>>(domains: &[S]) -> Self {
        let ranks = domains
            .iter()
            .enumerate()
            .map(|(i, d)| (d.as_ref(), i as u32))
            .collect();
        Self { ranks }
    }

    /// Rank of `url`: first matching preferred domain, else `UNRANKED`.
    pub fn rank(&self, url: &str) -> u32 {
        self.ranks.get(url).copied().unwrap_or(UNRANKED)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(&DEFAULT_PREFERRED_DOMAINS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order() {
        let t = PriorityTable::default();
        assert_eq!(t.rank("https://1fichier.com/?abc"), 0);
        assert_eq!(t.rank("https://katfile.com/abc/file.rar.html"), 1);
        assert_eq!(t.rank("https://mega.nz/file/abc#key"), 3);
        assert_eq!(t.rank("https://drive.google.com/file/d/abc"), 4);
        assert_eq!(t.rank("https://rapidgator.net/file/abc"), 5);
        assert_eq!(t.rank("https://turbobit.net/abc.html"), 6);
        assert_eq!(t.rank("https://uploaded.net/abc"), UNRANKED);
        assert_eq!(t.rank("not a url at all"), UNRANKED);
    }

    #[test]
    fn custom_order() {
        let t = PriorityTable::new(&["rapidgator.net", "1fichier"]);
        assert_eq!(t.rank("https://rapidgator.net/file/abc"), 0);
        assert_eq!(t.rank("https://1fichier.com/?abc"), 1);
        assert_eq!(t.rank("https://katfile.com/abc"), UNRANKED);
    }
}
