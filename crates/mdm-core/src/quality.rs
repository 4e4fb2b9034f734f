//! Quality tiers and the cascading-completion table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of release formats the orchestrator knows how to select between.
///
/// Ordering follows HD preference (`X265` best), with `Uhd2160p` last since it
/// lives in its own lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "x265")]
    X265,
    #[serde(rename = "1080p")]
    Fhd1080p,
    #[serde(rename = "m1080p")]
    Micro1080p,
    #[serde(rename = "2160p")]
    Uhd2160p,
}

impl QualityTier {
    /// HD lane, tried strictly in this order.
    pub const HD_ORDER: [QualityTier; 3] =
        [QualityTier::X265, QualityTier::Fhd1080p, QualityTier::Micro1080p];

    /// Parses a store/forum format tag. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "x265" => Some(QualityTier::X265),
            "1080p" => Some(QualityTier::Fhd1080p),
            "m1080p" => Some(QualityTier::Micro1080p),
            "2160p" => Some(QualityTier::Uhd2160p),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            QualityTier::X265 => "x265",
            QualityTier::Fhd1080p => "1080p",
            QualityTier::Micro1080p => "m1080p",
            QualityTier::Uhd2160p => "2160p",
        }
    }

    /// Tiers marked satisfied when this tier completes (itself plus every inferior HD tier).
    pub fn subsumed(self) -> &'static [QualityTier] {
        match self {
            QualityTier::X265 => &Self::HD_ORDER,
            QualityTier::Fhd1080p => &Self::HD_ORDER[1..],
            QualityTier::Micro1080p => &Self::HD_ORDER[2..],
            QualityTier::Uhd2160p => &[QualityTier::Uhd2160p],
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_tag_agree() {
        for tier in [
            QualityTier::X265,
            QualityTier::Fhd1080p,
            QualityTier::Micro1080p,
            QualityTier::Uhd2160p,
        ] {
            assert_eq!(QualityTier::parse(tier.tag()), Some(tier));
        }
        assert_eq!(QualityTier::parse(" X265 "), Some(QualityTier::X265));
        assert_eq!(QualityTier::parse("720p"), None);
    }

    #[test]
    fn cascade_table() {
        use QualityTier::*;
        assert_eq!(X265.subsumed(), &[X265, Fhd1080p, Micro1080p]);
        assert_eq!(Fhd1080p.subsumed(), &[Fhd1080p, Micro1080p]);
        assert_eq!(Micro1080p.subsumed(), &[Micro1080p]);
        assert_eq!(Uhd2160p.subsumed(), &[Uhd2160p]);
    }

    #[test]
    fn hd_order_is_sorted() {
        let mut sorted = QualityTier::HD_ORDER;
        sorted.sort();
        assert_eq!(sorted, QualityTier::HD_ORDER);
        assert!(!QualityTier::HD_ORDER.contains(&QualityTier::Uhd2160p));
    }
}
