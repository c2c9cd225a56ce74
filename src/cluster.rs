//! Pairwise clustering primitives shared by the locate path.

use mac_address::MacAddress;

/// Keys within this distance of each other are assumed to be multiple radios
/// on the same physical station.
const SIMILARITY_THRESHOLD: f64 = 2.0;

/// Single-linkage clustering over `items`.
///
/// Two items end up in the same cluster iff they are connected, directly or
/// through other items, by pairwise distances of at most `threshold`. The
/// full distance matrix is computed once; clusters are then merged until no
/// pair of clusters is within the threshold. Quadratic space and worst case
/// cubic time, which is fine for the size of a single query's candidate set.
///
/// Member order is preserved: a cluster lists the earliest item first, and
/// merged members keep their relative order.
pub fn cluster_elements<T, F>(items: Vec<T>, distance: F, threshold: f64) -> Vec<Vec<T>>
where
    F: Fn(&T, &T) -> f64,
{
    let matrix: Vec<Vec<f64>> = items
        .iter()
        .map(|a| items.iter().map(|b| distance(a, b)).collect())
        .collect();

    let cluster_distance = |a: &[usize], b: &[usize]| {
        let mut min = f64::INFINITY;
        for &i in a {
            for &j in b {
                min = min.min(matrix[i][j]);
            }
        }
        min
    };

    let mut clusters: Vec<Vec<usize>> = (0..items.len()).map(|i| vec![i]).collect();
    'scan: loop {
        for i in 0..clusters.len() {
            for j in 0..clusters.len() {
                if i == j {
                    continue;
                }
                if cluster_distance(&clusters[i], &clusters[j]) <= threshold {
                    let absorbed = clusters.remove(j);
                    let i = if j < i { i - 1 } else { i };
                    clusters[i].extend(absorbed);
                    continue 'scan;
                }
            }
        }
        break;
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    clusters
        .into_iter()
        .map(|c| c.into_iter().map(|i| slots[i].take().expect("unique index")).collect())
        .collect()
}

/// Minimum of the arithmetic difference and the bit-level hamming distance,
/// summed over aligned byte positions. Trailing bytes of the longer input
/// are ignored.
pub fn key_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&a, &b)| u32::min(a.abs_diff(b) as u32, (a ^ b).count_ones()))
        .sum()
}

/// Collapses near-duplicate hardware addresses, keeping one representative
/// per similarity cluster (the first occurrence in input order). Multiple
/// radios of one physical station usually differ in only the last byte or
/// two and must not count as independent evidence.
pub fn filter_similar_keys(keys: Vec<MacAddress>) -> Vec<MacAddress> {
    let clusters = cluster_elements(
        keys,
        |a, b| key_distance(&a.bytes(), &b.bytes()) as f64,
        SIMILARITY_THRESHOLD,
    );
    clusters.into_iter().map(|c| c[0]).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    fn mac(bytes: [u8; 6]) -> MacAddress {
        MacAddress::new(bytes)
    }

    #[test]
    fn chains_merge_transitively() {
        let clusters = cluster_elements(vec![0.0f64, 2.0, 4.0, 10.0], |a, b| (a - b).abs(), 2.0);
        assert_eq!(clusters, vec![vec![0.0, 2.0, 4.0], vec![10.0]]);
    }

    #[test]
    fn disconnected_items_stay_apart() {
        let clusters = cluster_elements(vec![0.0f64, 5.0, 11.0], |a, b| (a - b).abs(), 2.0);
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn empty_input() {
        let clusters = cluster_elements(Vec::<f64>::new(), |a, b| (a - b).abs(), 2.0);
        assert!(clusters.is_empty());
    }

    #[test]
    fn byte_distance_picks_the_smaller_metric() {
        // 0xbb vs 0xbd: arithmetic 2, hamming 2
        assert_eq!(key_distance(&[0xaa, 0x00, 0xbb], &[0xaa, 0x00, 0xbd]), 2);
        // 0x00 vs 0xff: arithmetic 255, hamming 8
        assert_eq!(key_distance(&[0x00], &[0xff]), 8);
        // trailing bytes of the longer key are ignored
        assert_eq!(key_distance(&[0xaa, 0x01], &[0xaa]), 0);
    }

    #[test]
    fn similar_keys_collapse_to_first_occurrence() {
        let keys = vec![
            mac([0xaa, 0x00, 0xbb, 0x01, 0x02, 0x03]),
            mac([0xaa, 0x00, 0xbd, 0x01, 0x02, 0x03]),
            mac([0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc]),
        ];
        let filtered = filter_similar_keys(keys.clone());
        assert_eq!(filtered, vec![keys[0], keys[2]]);
    }

    #[test]
    fn distinct_keys_survive() {
        let keys = vec![
            mac([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
            mac([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
        ];
        assert_eq!(filter_similar_keys(keys).len(), 2);
    }

    /// Reference partition: connected components of the threshold graph.
    fn components(items: &[u32], threshold: u32) -> BTreeSet<Vec<u32>> {
        let n = items.len();
        let mut seen = vec![false; n];
        let mut out = BTreeSet::new();
        for start in 0..n {
            if seen[start] {
                continue;
            }
            let mut stack = vec![start];
            let mut member = Vec::new();
            seen[start] = true;
            while let Some(i) = stack.pop() {
                member.push(items[i]);
                for j in 0..n {
                    if !seen[j] && items[i].abs_diff(items[j]) <= threshold {
                        seen[j] = true;
                        stack.push(j);
                    }
                }
            }
            member.sort_unstable();
            out.insert(member);
        }
        out
    }

    fn as_partition(clusters: Vec<Vec<u32>>) -> BTreeSet<Vec<u32>> {
        clusters
            .into_iter()
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect()
    }

    proptest! {
        #[test]
        fn clustering_matches_connected_components(
            items in proptest::collection::vec(0u32..60, 0..12),
        ) {
            let clusters = cluster_elements(items.clone(), |a, b| a.abs_diff(*b) as f64, 3.0);
            prop_assert_eq!(as_partition(clusters), components(&items, 3));
        }

        #[test]
        fn clustering_is_order_independent(
            (items, perm) in proptest::collection::vec(0u32..60, 1..12).prop_flat_map(|v| {
                let n = v.len();
                (Just(v), Just((0..n).collect::<Vec<_>>()).prop_shuffle())
            }),
        ) {
            let shuffled: Vec<u32> = perm.iter().map(|&i| items[i]).collect();
            let a = as_partition(cluster_elements(items, |a, b| a.abs_diff(*b) as f64, 3.0));
            let b = as_partition(cluster_elements(shuffled, |a, b| a.abs_diff(*b) as f64, 3.0));
            prop_assert_eq!(a, b);
        }
    }
}
