use std::num::NonZeroUsize;

use crate::source::Address;

/// A contiguous run of addresses
pub type AddressGroup<'a> = &'a [Address];

/// Splits addresses into consecutive groups of `group_size`. The last group may be shorter
///
/// Groups are only a structural unit; they do not bound concurrency
pub fn partition(addresses: &[Address], group_size: NonZeroUsize) -> Vec<AddressGroup<'_>> {
    addresses.chunks(group_size.get()).collect()
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    fn addresses(n: usize) -> Vec<Address> {
        (0..n).map(|i| Address::from(format!("0x{:040x}", i))).collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[rstest]
    #[case::uneven(120, 50, vec![50, 50, 20])]
    #[case::exact_multiple(100, 50, vec![50, 50])]
    #[case::smaller_than_group(7, 50, vec![7])]
    #[case::single_address_groups(3, 1, vec![1, 1, 1])]
    #[case::empty(0, 50, vec![])]
    fn test_group_sizes(#[case] n: usize, #[case] group_size: usize, #[case] expected: Vec<usize>) {
        let input = addresses(n);

        let groups = partition(&input, size(group_size));

        assert_eq!(groups.iter().map(|g| g.len()).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    fn test_concatenation_preserves_order(
        #[values(0, 1, 49, 50, 51, 120, 1000)] n: usize,
        #[values(1, 7, 50, 2000)] group_size: usize,
    ) {
        let input = addresses(n);

        let groups = partition(&input, size(group_size));

        assert_eq!(groups.len(), n.div_ceil(group_size));
        assert!(groups.iter().all(|g| !g.is_empty() && g.len() <= group_size));
        assert_eq!(groups.concat(), input);
    }

    #[test]
    fn test_idempotent() {
        let input = addresses(233);

        let first = partition(&input, size(50));
        let second = partition(&input, size(50));

        assert_eq!(first, second);
    }
}
