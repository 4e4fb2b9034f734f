//! Mirror classification: archive part detection and source priority.

mod part;
mod priority;

pub use part::part_number;
pub use priority::{PriorityTable, DEFAULT_PREFERRED_DOMAINS, UNRANKED};

use crate::model::MirrorLink;
use crate::url_model::normalize_host;

/// Classifies a raw mirror URL at `position` in its variant's link list.
pub fn classify_link(url: &str, position: usize, priorities: &PriorityTable) -> MirrorLink {
    MirrorLink {
        url: url.to_string(),
        host: normalize_host(url).unwrap_or_default(),
        priority: priorities.rank(url),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_link_fills_host_and_rank() {
        let table = PriorityTable::default();
        let link = classify_link("https://www.Pixeldrain.com/u/abc", 4, &table);
        assert_eq!(link.host, "pixeldrain.com");
        assert_eq!(link.priority, 2);
        assert_eq!(link.position, 4);

        let unknown = classify_link("https://nitroflare.com/view/x", 0, &table);
        assert_eq!(unknown.priority, UNRANKED);
    }
}
