//! Case-insensitive substring search with title-first ranking.

use serde::{Deserialize, Serialize};

use crate::models::Place;
use crate::utils::{cmp_ignore_case, contains_ignore_case, fold};

/// Which fields beyond title and address a query may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub include_description: bool,
    pub include_labels: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_description: true,
            include_labels: true,
        }
    }
}

impl SearchOptions {
    /// Title and address only
    pub fn basic() -> Self {
        Self {
            include_description: false,
            include_labels: false,
        }
    }
}

/// Rank tier of a match; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    TitlePrefix,
    TitleContains,
    Other,
}

fn tier(place: &Place, query: &str, options: &SearchOptions) -> Option<MatchTier> {
    let title = place.title.to_lowercase();
    if title.starts_with(query) {
        return Some(MatchTier::TitlePrefix);
    }
    if title.contains(query) {
        return Some(MatchTier::TitleContains);
    }

    let other = contains_ignore_case(&place.address, query)
        || (options.include_description && contains_ignore_case(&place.description, query))
        || (options.include_labels
            && place.labels().iter().any(|l| contains_ignore_case(l, query)));
    other.then_some(MatchTier::Other)
}

/// Places matching `query`, best matches first.
///
/// The query is trimmed and case-folded; an empty query returns the input
/// unchanged. Within a tier, places sort by title ignoring case.
pub fn search(places: &[Place], query: &str, options: &SearchOptions) -> Vec<Place> {
    let query = fold(query);
    if query.is_empty() {
        return places.to_vec();
    }

    let mut matches: Vec<(MatchTier, &Place)> = places
        .iter()
        .filter_map(|place| tier(place, &query, options).map(|t| (t, place)))
        .collect();

    matches.sort_by(|(tier_a, a), (tier_b, b)| {
        tier_a
            .cmp(tier_b)
            .then_with(|| cmp_ignore_case(&a.title, &b.title))
            .then_with(|| a.id.cmp(&b.id))
    });

    matches.into_iter().map(|(_, place)| place.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    fn place(id: &str, title: &str) -> Place {
        Place {
            id: id.to_string(),
            title: title.to_string(),
            address: String::new(),
            description: String::new(),
            labels: None,
            location: Location::default(),
            urls: None,
        }
    }

    fn titles(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_prefix_before_contains() {
        let places = vec![
            place("1", "Blue Cafe"),
            place("2", "Cafe Blue"),
            place("3", "Ocean Cafe"),
        ];
        let results = search(&places, "cafe", &SearchOptions::default());
        assert_eq!(titles(&results), vec!["Cafe Blue", "Blue Cafe", "Ocean Cafe"]);
    }

    #[test]
    fn test_query_is_trimmed_and_folded() {
        let places = vec![place("1", "Hallasan"), place("2", "Seongsan")];
        let results = search(&places, "  HALLA ", &SearchOptions::default());
        assert_eq!(titles(&results), vec!["Hallasan"]);
    }

    #[test]
    fn test_empty_query_returns_input() {
        let places = vec![place("1", "Zeta"), place("2", "Alpha")];
        assert_eq!(search(&places, "   ", &SearchOptions::default()), places);
        assert_eq!(search(&places, "", &SearchOptions::default()), places);
    }

    #[test]
    fn test_non_title_matches_rank_last() {
        let mut by_address = place("1", "Aewol Bakery");
        by_address.address = "Cafe Street 12".to_string();
        let places = vec![by_address, place("2", "Zebra Cafe")];

        let results = search(&places, "cafe", &SearchOptions::basic());
        assert_eq!(titles(&results), vec!["Zebra Cafe", "Aewol Bakery"]);
    }

    #[test]
    fn test_options_extend_match_set() {
        let mut described = place("1", "Hyeopjae");
        described.description = "White sand beach".to_string();
        let mut labelled = place("2", "Iho Tewoo");
        labelled.labels = Some(vec!["Beach".to_string()]);
        let places = vec![described, labelled];

        assert!(search(&places, "beach", &SearchOptions::basic()).is_empty());

        let results = search(&places, "beach", &SearchOptions::default());
        assert_eq!(titles(&results), vec!["Hyeopjae", "Iho Tewoo"]);

        let labels_only = SearchOptions {
            include_description: false,
            include_labels: true,
        };
        assert_eq!(titles(&search(&places, "beach", &labels_only)), vec!["Iho Tewoo"]);
    }

    #[test]
    fn test_ties_sort_by_title_ignoring_case() {
        let places = vec![place("1", "cafe b"), place("2", "Cafe A"), place("3", "CAFE C")];
        let results = search(&places, "cafe", &SearchOptions::default());
        assert_eq!(titles(&results), vec!["Cafe A", "cafe b", "CAFE C"]);
    }
}
