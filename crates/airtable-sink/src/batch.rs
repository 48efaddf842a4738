//! Fixed-size batch partitioning.

/// Split `items` into contiguous slices of `size`, the last possibly shorter.
///
/// A `size` of 0 is treated as 1; callers validate their batch sizes.
pub fn partition<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sizes() {
        let items: Vec<u32> = (0..23).collect();
        let batches = partition(&items, 10);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
    }

    #[test]
    fn test_partition_concatenates_to_input() {
        for n in [0usize, 1, 9, 10, 11, 30, 31] {
            for k in [1usize, 3, 10] {
                let items: Vec<usize> = (0..n).collect();
                let batches = partition(&items, k);
                assert_eq!(batches.len(), n.div_ceil(k), "n={n} k={k}");
                assert_eq!(batches.concat(), items, "n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_partition_empty() {
        let items: Vec<u8> = Vec::new();
        assert!(partition(&items, 10).is_empty());
    }
}
