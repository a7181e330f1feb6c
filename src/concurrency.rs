//! Concurrency helper: limit the number of events exported in parallel.

use rayon::prelude::*;

/// Run `f` over `items` with at most `limit` in flight. `f` gets the item's index.
pub fn for_each_limited<T, F>(items: &[T], limit: usize, f: F)
where
    T: Sync,
    F: Sync + Fn(usize, &T),
{
    if limit <= 1 {
        for (i, item) in items.iter().enumerate() {
            f(i, item);
        }
        return;
    }
    for (chunk_no, chunk) in items.chunks(limit).enumerate() {
        let base = chunk_no * limit;
        chunk.par_iter().enumerate().for_each(|(i, item)| f(base + i, item));
    }
}
