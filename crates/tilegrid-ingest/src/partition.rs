//! Contiguous near-equal partitioning of the image list.
//!
//! Partition sizing is static, decided once at batch start from the full
//! image count. Every partition except the last holds `ceil(N / W)`
//! items; the last absorbs the remainder. Concatenating the partitions
//! in index order reproduces the input exactly, which keeps logs and
//! progress reproducible across runs.

/// Split `items` into `workers` contiguous partitions.
///
/// `workers` of zero is treated as one. More workers than items yields
/// trailing empty partitions; an empty input yields all-empty partitions.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let step = items.len().div_ceil(workers).max(1);

    let mut partitions: Vec<Vec<T>> = Vec::with_capacity(workers);
    let mut remaining = items;
    for index in 0..workers {
        if index + 1 == workers {
            partitions.push(std::mem::take(&mut remaining));
        } else {
            let take = step.min(remaining.len());
            let rest = remaining.split_off(take);
            partitions.push(std::mem::replace(&mut remaining, rest));
        }
    }
    partitions
}
