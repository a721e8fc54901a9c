use num_cpus::get_physical;

/// Environment variable overriding the worker count for every parallel
/// operation in the crate.
pub static NUM_THREADS_ENV: &str = "EDGEIO_NUM_THREADS";

/// Worker count for one operation.
///
/// Resolved once at the start of each operation: the [`NUM_THREADS_ENV`]
/// variable when set to a positive integer, otherwise twice the physical
/// core count.
pub fn thread_count() -> usize {
    if let Ok(v) = std::env::var(NUM_THREADS_ENV) {
        if let Ok(n) = v.trim().parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
    }
    (get_physical() * 2).max(1)
}

/// Exclusive prefix sum of `sizes` into a fresh vector, plus the total.
///
/// `out[k]` is the sum of all sizes before worker `k`. Computed into a
/// separate allocation so no slot is read after being overwritten.
pub(crate) fn exclusive_prefix_sum(sizes: &[usize]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut sum = 0usize;
    for &s in sizes {
        offsets.push(sum);
        sum += s;
    }
    (offsets, sum)
}
