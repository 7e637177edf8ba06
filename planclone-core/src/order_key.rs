//! Recovers sibling order from opaque [`OrderKey`](crate::types::OrderKey)s.
//!
//! The service never exposes an explicit rank. Ordering is recovered by a
//! single-position comparison:
//!
//! 1. A singleton set ranks `0`.
//! 2. The pivot is the first position (below the shortest key length) where
//!    the keys do not all agree; if they agree over the whole shared prefix
//!    the pivot is the shared length itself.
//! 3. Each key contributes its character code at the pivot, or a sentinel
//!    below every real code when it is too short.
//! 4. Keys are ranked by that code, highest first. Ties keep input order.
//!
//! This is exact for two keys, and for any set whose keys all differ at the
//! pivot. A larger set with ties at the pivot that only diverge later keeps
//! the tied keys in input order rather than recursing into them.

/// Rank each key by position in `keys`; rank `0` comes first.
///
/// Returns one rank per input key (so duplicate keys still get distinct
/// ranks). An empty input yields an empty ranking.
pub fn ranks<K: AsRef<str>>(keys: &[K]) -> Vec<usize> {
    match keys.len() {
        0 => return Vec::new(),
        1 => return vec![0],
        _ => {}
    }

    let chars: Vec<Vec<char>> = keys.iter().map(|k| k.as_ref().chars().collect()).collect();
    let pivot = pivot_position(&chars);

    let mut visit: Vec<usize> = (0..chars.len()).collect();
    // Stable, descending by code at the pivot; `None` sorts last.
    visit.sort_by(|&a, &b| code_at(&chars[b], pivot).cmp(&code_at(&chars[a], pivot)));

    let mut ranks = vec![0; chars.len()];
    for (rank, index) in visit.into_iter().enumerate() {
        ranks[index] = rank;
    }
    ranks
}

/// Sort `items` into the service's intended sibling order.
pub fn order_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let ranking = ranks(&items.iter().map(&key).collect::<Vec<_>>());
    let mut ranked: Vec<(usize, T)> = ranking.into_iter().zip(items).collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, item)| item).collect()
}

/// First position where the keys disagree, or the shortest length when they
/// share it entirely.
fn pivot_position(keys: &[Vec<char>]) -> usize {
    let shortest = keys.iter().map(Vec::len).min().unwrap_or(0);
    (0..shortest)
        .find(|&pos| {
            let first = keys[0][pos];
            keys.iter().any(|key| key[pos] != first)
        })
        .unwrap_or(shortest)
}

fn code_at(key: &[char], pos: usize) -> Option<u32> {
    key.get(pos).map(|c| u32::from(*c))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_input_yields_empty_ranking() {
        let keys: [&str; 0] = [];
        assert!(ranks(&keys).is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("8585269235419217847")]
    #[case(" !")]
    fn singleton_ranks_zero(#[case] key: &str) {
        assert_eq!(ranks(&[key]), vec![0]);
    }

    #[test]
    fn higher_code_at_first_difference_comes_first() {
        assert_eq!(ranks(&["abc", "abd"]), vec![1, 0]);
    }

    #[test]
    fn shorter_prefix_key_comes_after() {
        assert_eq!(ranks(&["ab", "abx"]), vec![1, 0]);
    }

    #[rstest]
    #[case("aab", "aac")]
    #[case("8585", "8586")]
    #[case("a", "b")]
    #[case("zz", "zz!")]
    #[case(" !", "!")]
    fn two_keys_match_direct_comparison(#[case] lo: &str, #[case] hi: &str) {
        // `hi` is greater at its first difference, or `lo` ran out first.
        assert_eq!(ranks(&[lo, hi]), vec![1, 0]);
        assert_eq!(ranks(&[hi, lo]), vec![0, 1]);
    }

    #[test]
    fn identical_keys_keep_input_order() {
        assert_eq!(ranks(&["same", "same", "same"]), vec![0, 1, 2]);
    }

    #[test]
    fn distinct_codes_at_pivot_rank_fully() {
        assert_eq!(ranks(&["k1", "k3", "k2", "k0"]), vec![2, 0, 1, 3]);
    }

    #[test]
    fn ties_at_pivot_are_not_broken_by_later_positions() {
        // Pivot is position 1; "axb" and "axc" tie there and stay in input
        // order even though they differ at position 2.
        assert_eq!(ranks(&["axb", "axc", "ay"]), vec![1, 2, 0]);
    }

    #[test]
    fn order_by_key_sorts_items() {
        let items = vec![("first", "aab"), ("second", "aac")];
        let ordered = order_by_key(items, |(_, key)| *key);
        assert_eq!(ordered, vec![("second", "aac"), ("first", "aab")]);
    }
}
