//! Even partitioning of ordered work across parallel workers

use bulkload_common::{LoadError, Result};

/// Split `items` into at most `n` contiguous partitions of near-equal size.
///
/// When there are fewer items than requested partitions, the partition count
/// drops to the item count so no partition is ever empty. Sizes differ by at
/// most one, the first `len % n` partitions carry the extra item, and
/// concatenating the partitions in order reconstructs the input exactly.
pub fn partition<T>(items: Vec<T>, n: usize) -> Result<Vec<Vec<T>>> {
    if n == 0 {
        return Err(LoadError::config("partition count must be at least 1"));
    }

    let len = items.len();
    if len == 0 {
        return Ok(Vec::new());
    }

    let n = n.min(len);
    let base = len / n;
    let rem = len % n;

    let mut partitions = Vec::with_capacity(n);
    let mut iter = items.into_iter();
    for i in 0..n {
        let size = base + usize::from(i < rem);
        partitions.push(iter.by_ref().take(size).collect());
    }
    Ok(partitions)
}
