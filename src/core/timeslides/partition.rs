/// Split `items` into `bins` consecutive groups whose sizes differ by at most one.
///
/// The first `len % bins` groups take one extra item. Returns no groups when
/// `bins` is zero.
pub fn partition<T>(items: Vec<T>, bins: usize) -> Vec<Vec<T>> {
    if bins == 0 {
        return Vec::new();
    }
    let base = items.len() / bins;
    let extra = items.len() % bins;
    let mut groups = Vec::with_capacity(bins);
    let mut iter = items.into_iter();
    for i in 0..bins {
        let size = base + usize::from(i < extra);
        groups.push(iter.by_ref().take(size).collect());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extra_items_go_to_leading_groups() {
        let groups = partition((0..7).collect(), 3);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn more_bins_than_items() {
        let groups = partition(vec!['a', 'b'], 4);
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 1, 0, 0]);
    }

    proptest! {
        #[test]
        fn every_item_once_and_balanced(n in 0usize..200, m in 1usize..20) {
            let groups = partition((0..n).collect::<Vec<_>>(), m);
            prop_assert_eq!(groups.len(), m);
            let flat: Vec<usize> = groups.iter().flatten().copied().collect();
            prop_assert_eq!(flat, (0..n).collect::<Vec<_>>());
            let max = groups.iter().map(Vec::len).max().unwrap();
            let min = groups.iter().map(Vec::len).min().unwrap();
            prop_assert!(max - min <= 1);
        }
    }
}
