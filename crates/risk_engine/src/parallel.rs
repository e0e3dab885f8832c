//! Rayon-based parallelisation utilities.
//!
//! Small helpers for the scenario fan-out. Batch sizes are tuned for
//! cache utilisation; below the parallel threshold the overhead of the
//! thread pool outweighs the work and callers run sequentially.

use rayon::prelude::*;

/// Batch size for parallel processing.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Minimum items before the fan-out pays for itself.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Configuration for parallel execution.
#[derive(Clone, Copy, Debug)]
pub struct ParallelConfig {
    /// Batch size for chunked processing.
    pub batch_size: usize,
    /// Minimum items before using parallelism.
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(batch_size: usize, parallel_threshold: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            parallel_threshold,
        }
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelize(&self, n_items: usize) -> bool {
        n_items >= self.parallel_threshold
    }
}

/// Processes items in parallel batches, preserving item order.
pub fn process_in_batches<T, R, F>(items: &[T], batch_size: usize, processor: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items
        .par_chunks(batch_size.max(1))
        .flat_map_iter(|batch| batch.iter().map(&processor).collect::<Vec<_>>())
        .collect()
}

/// Parallel map over items, preserving order.
pub fn parallel_map<T, R, F>(items: &[T], mapper: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(mapper).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_in_batches_preserves_order() {
        let items: Vec<i32> = (0..100).collect();
        let doubled = process_in_batches(&items, 10, |&x| x * 2);
        assert_eq!(doubled.len(), 100);
        assert_eq!(doubled[7], 14);
        assert_eq!(doubled[99], 198);
    }

    #[test]
    fn test_parallel_map() {
        let items: Vec<i32> = (0..50).collect();
        let squared = parallel_map(&items, |&x| x * x);
        assert_eq!(squared[6], 36);
    }

    #[test]
    fn test_should_parallelize() {
        let config = ParallelConfig::default();
        assert!(!config.should_parallelize(2));
        assert!(config.should_parallelize(DEFAULT_PARALLEL_THRESHOLD));
        let custom = ParallelConfig::new(0, 1);
        assert_eq!(custom.batch_size, 1);
        assert!(custom.should_parallelize(1));
    }
}
