//! Ordering of branch-scan results.

use std::cmp::Ordering;

use crate::autolink::reference::{Autolink, AutolinkMap};

/// Compares two branch-scan matches; `Less` ranks first.
///
/// A match at position zero ranks ahead of every other match. The rest rank
/// by prefix length (longest first), then id length (longest first), then
/// position (earliest first).
pub fn compare_autolinks(a: &Autolink, b: &Autolink) -> Ordering {
    match (a.index == 0, b.index == 0) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b
            .prefix
            .chars()
            .count()
            .cmp(&a.prefix.chars().count())
            .then_with(|| b.id.chars().count().cmp(&a.id.chars().count()))
            .then_with(|| a.index.cmp(&b.index)),
    }
}

/// Sorts `links` in place by [`compare_autolinks`]. The sort is stable.
pub fn rank(links: &mut AutolinkMap) {
    links.sort_by(|_, a, _, b| compare_autolinks(a, b));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::autolink::test_utils::link_from;

    fn link(prefix: &str, id: &str, index: usize) -> Autolink {
        let mut link = link_from(id, None);
        link.prefix = prefix.to_string();
        link.index = index;
        link.url = format!("https://x/{prefix}{id}");
        link
    }

    fn ranked(links: Vec<Autolink>) -> Vec<(String, usize)> {
        let mut map: AutolinkMap = links
            .into_iter()
            .map(|l| (l.url.clone(), l))
            .collect();
        rank(&mut map);
        map.values()
            .map(|l| (format!("{}{}", l.prefix, l.id), l.index))
            .collect()
    }

    #[test]
    fn position_zero_ranks_first() {
        let order = ranked(vec![
            link("PROJECT-", "123", 5),
            link("#", "1", 0),
        ]);
        assert_eq!(order[0], ("#1".to_string(), 0));
    }

    #[test]
    fn longer_prefix_ranks_higher() {
        let order = ranked(vec![link("#", "42", 3), link("JIRA-", "4", 10)]);
        assert_eq!(order[0].0, "JIRA-4");
    }

    #[test]
    fn longer_id_breaks_prefix_ties() {
        let order = ranked(vec![link("#", "4", 3), link("#", "4000", 10)]);
        assert_eq!(order[0].0, "#4000");
    }

    #[test]
    fn earlier_position_breaks_remaining_ties() {
        let order = ranked(vec![link("#", "41", 10), link("#", "42", 3)]);
        assert_eq!(order, vec![("#42".to_string(), 3), ("#41".to_string(), 10)]);
    }

    #[test]
    fn prefix_length_counts_characters() {
        // Two characters, six bytes.
        let order = ranked(vec![link("AB", "1", 3), link("\u{2116}\u{2116}X", "1", 9)]);
        assert_eq!(order[0].0, "\u{2116}\u{2116}X1");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_link() -> impl Strategy<Value = Autolink> {
            ("[A-Z#]{1,6}", "[0-9]{1,5}", 0usize..40)
                .prop_map(|(prefix, id, index)| link(&prefix, &id, index))
        }

        proptest! {
            #[test]
            fn ranking_is_a_total_order(links in proptest::collection::vec(arb_link(), 1..12)) {
                for a in &links {
                    prop_assert_eq!(compare_autolinks(a, a), Ordering::Equal);
                    for b in &links {
                        prop_assert_eq!(compare_autolinks(a, b), compare_autolinks(b, a).reverse());
                        for c in &links {
                            if compare_autolinks(a, b) != Ordering::Greater
                                && compare_autolinks(b, c) != Ordering::Greater
                            {
                                prop_assert_ne!(compare_autolinks(a, c), Ordering::Greater);
                            }
                        }
                    }
                }
            }

            #[test]
            fn zero_position_precedes_everything_else(links in proptest::collection::vec(arb_link(), 1..12)) {
                let mut map: AutolinkMap = links
                    .into_iter()
                    .map(|l| (l.url.clone(), l))
                    .collect();
                rank(&mut map);
                let first_nonzero = map.values().position(|l| l.index != 0).unwrap_or(map.len());
                prop_assert!(map.values().skip(first_nonzero).all(|l| l.index != 0));
            }
        }
    }
}
