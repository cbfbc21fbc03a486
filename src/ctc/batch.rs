//! Batch scheduling for the per-sequence decode kernel.
//!
//! Each sequence owns exactly one output row and one decoded-length slot, so the
//! batch is split with `chunks_mut` and never needs a lock. Sequential and parallel
//! runs hand the kernel the same `(n, row)` pairs and produce identical buffers.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::config::{DecoderConfig, ExecutionMode};
use crate::error::{DecoderError, Result};
use crate::types::{Label, Shape4};

/// Runs a row kernel over every sequence of a batch.
#[derive(Clone)]
pub(crate) struct BatchExecutor {
    mode: ExecutionMode,
    parallel_threshold: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("mode", &self.mode)
            .field("parallel_threshold", &self.parallel_threshold)
            .field(
                "pool_threads",
                &self.pool.as_ref().map(|p| p.current_num_threads()),
            )
            .finish()
    }
}

impl BatchExecutor {
    pub(crate) fn new(config: &DecoderConfig) -> Result<Self> {
        let pool = match config.worker_threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("ctc-decode-{}", i))
                    .build()
                    .map_err(|e| {
                        DecoderError::Configuration(format!(
                            "Failed to build decoder worker pool: {}",
                            e
                        ))
                    })?;
                debug!(threads, "Created dedicated decoder worker pool");
                Some(Arc::new(pool))
            }
            None => None,
        };

        Ok(Self {
            mode: config.execution,
            parallel_threshold: config.parallel_threshold,
            pool,
        })
    }

    /// Whether a batch of this shape is fanned out to worker threads.
    pub(crate) fn is_parallel(&self, shape: &Shape4) -> bool {
        match self.mode {
            ExecutionMode::Sequential => false,
            ExecutionMode::Parallel => true,
            ExecutionMode::Auto => {
                shape.batch > 1
                    && shape
                        .numel()
                        .map_or(false, |numel| numel >= self.parallel_threshold)
                    && self.available_threads() > 1
            }
        }
    }

    fn available_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map(|p| p.current_num_threads())
            .unwrap_or_else(num_cpus::get)
    }

    /// Call `kernel(n, row)` for every row of `labels` and store the returned decoded
    /// length in `decoded_lengths[n]` when that buffer is present.
    ///
    /// `labels.len()` must be a multiple of `row_len`, and `decoded_lengths` must hold
    /// one slot per row; the decoder checks both before calling in. Kernel results are
    /// bounded by a validated `T`, so they fit an `i32`.
    pub(crate) fn run<L, F>(
        &self,
        shape: &Shape4,
        labels: &mut [L],
        row_len: usize,
        decoded_lengths: Option<&mut [i32]>,
        kernel: F,
    ) where
        L: Label,
        F: Fn(usize, &mut [L]) -> usize + Sync,
    {
        if !self.is_parallel(shape) {
            match decoded_lengths {
                Some(lengths) => labels
                    .chunks_mut(row_len)
                    .zip(lengths.iter_mut())
                    .enumerate()
                    .for_each(|(n, (row, len))| *len = kernel(n, row) as i32),
                None => labels.chunks_mut(row_len).enumerate().for_each(|(n, row)| {
                    kernel(n, row);
                }),
            }
            return;
        }

        let work = || match decoded_lengths {
            Some(lengths) => labels
                .par_chunks_mut(row_len)
                .zip(lengths.par_iter_mut())
                .enumerate()
                .for_each(|(n, (row, len))| *len = kernel(n, row) as i32),
            None => labels
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(n, row)| {
                    kernel(n, row);
                }),
        };

        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(mode: ExecutionMode) -> BatchExecutor {
        let config = DecoderConfig::builder().execution(mode).build().unwrap();
        BatchExecutor::new(&config).unwrap()
    }

    #[test]
    fn test_mode_selection() {
        let small = Shape4::new(2, 8, 11);
        assert!(!executor(ExecutionMode::Sequential).is_parallel(&small));
        assert!(executor(ExecutionMode::Parallel).is_parallel(&small));
        assert!(!executor(ExecutionMode::Auto).is_parallel(&small));

        let single = Shape4::new(1, 4096, 4096);
        assert!(!executor(ExecutionMode::Auto).is_parallel(&single));
    }

    #[test]
    fn test_rows_are_disjoint_and_complete() {
        for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
            let shape = Shape4::new(5, 3, 2);
            let mut labels = vec![0i32; 5 * 4];
            let mut lengths = vec![-7i32; 5];

            executor(mode).run(&shape, &mut labels, 4, Some(lengths.as_mut_slice()), |n, row| {
                row.iter_mut().for_each(|slot| *slot = n as i32);
                n
            });

            let expected: Vec<i32> = (0..5).flat_map(|n| [n; 4]).collect();
            assert_eq!(labels, expected, "{:?}", mode);
            assert_eq!(lengths, vec![0, 1, 2, 3, 4], "{:?}", mode);
        }
    }

    #[test]
    fn test_dedicated_pool() {
        let config = DecoderConfig::builder()
            .execution(ExecutionMode::Parallel)
            .worker_threads(2)
            .build()
            .unwrap();
        let executor = BatchExecutor::new(&config).unwrap();
        assert_eq!(executor.available_threads(), 2);

        let shape = Shape4::new(3, 1, 1);
        let mut labels = vec![0.0f32; 3];
        executor.run(&shape, &mut labels, 1, None, |n, row| {
            row[0] = n as f32 * 2.0;
            1
        });
        assert_eq!(labels, vec![0.0, 2.0, 4.0]);
    }
}
