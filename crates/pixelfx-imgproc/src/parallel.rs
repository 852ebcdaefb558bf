use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The buffer length is not a whole number of rows.
    #[error("buffer length {0} is not a multiple of the row stride {1}")]
    InvalidRowStride(usize, usize),
}

/// Controls how the per-row work of a filter is executed.
///
/// Every strategy produces identical output bytes: rows are independent and
/// any shared lookup table is built before the rows are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Returns true if the strategy dispatches rows to worker threads.
    pub fn is_parallel(&self) -> bool {
        !matches!(self, ExecutionStrategy::Serial)
    }
}

fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, ParallelError> {
    if num_threads == 0 {
        return Err(ParallelError::InvalidThreadCount(num_threads));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))
}

/// Run a multi-pass operation under `strategy`.
///
/// For [`ExecutionStrategy::Fixed`] a single pool is built and `f` runs inside
/// it with [`ExecutionStrategy::ParallelRows`], so every pass of `f` shares
/// that pool. Other strategies are handed to `f` unchanged.
///
/// # Errors
///
/// Returns an error if the [`ExecutionStrategy::Fixed`] pool cannot be built.
pub fn install<R, F>(strategy: ExecutionStrategy, f: F) -> Result<R, ParallelError>
where
    R: Send,
    F: FnOnce(ExecutionStrategy) -> R + Send,
{
    match strategy {
        ExecutionStrategy::Fixed(n) => {
            let pool = build_pool(n)?;
            Ok(pool.install(|| f(ExecutionStrategy::ParallelRows)))
        }
        other => Ok(f(other)),
    }
}

/// Apply `f` to every row of `dst` with the given strategy.
///
/// The closure receives the row index and the mutable row slice of `row_len`
/// samples.
///
/// # Errors
///
/// Returns an error if `dst` is not a whole number of rows or if a
/// [`ExecutionStrategy::Fixed`] pool cannot be built.
pub fn for_each_row_mut<T, F>(
    strategy: ExecutionStrategy,
    dst: &mut [T],
    row_len: usize,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if dst.is_empty() {
        return Ok(());
    }

    if row_len == 0 || dst.len() % row_len != 0 {
        return Err(ParallelError::InvalidRowStride(dst.len(), row_len));
    }

    match strategy {
        ExecutionStrategy::Serial => {
            dst.chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row));
        }
        ExecutionStrategy::ParallelRows => {
            dst.par_chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|(r, row)| f(r, row));
        }
        ExecutionStrategy::Fixed(n) => {
            build_pool(n)?.install(|| {
                dst.par_chunks_exact_mut(row_len)
                    .enumerate()
                    .for_each(|(r, row)| f(r, row));
            });
        }
    }

    Ok(())
}

/// Apply `f` to every `C`-sample pixel of `data`, processing rows of
/// `row_len` samples with the given strategy.
pub fn for_each_pixel_mut<const C: usize, F>(
    strategy: ExecutionStrategy,
    data: &mut [u8],
    row_len: usize,
    f: F,
) -> Result<(), ParallelError>
where
    F: Fn(&mut [u8]) + Send + Sync,
{
    for_each_row_mut(strategy, data, row_len, |_, row| {
        row.chunks_exact_mut(C).for_each(&f);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_serial() {
        let mut dst = vec![0usize; 6];
        for_each_row_mut(ExecutionStrategy::Serial, &mut dst, 2, |r, row| {
            row.iter_mut().for_each(|v| *v = r);
        })
        .unwrap();
        assert_eq!(dst, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_rows_parallel() {
        let mut dst = vec![0usize; 6];
        for_each_row_mut(ExecutionStrategy::ParallelRows, &mut dst, 3, |r, row| {
            row.iter_mut().for_each(|v| *v = r + 10);
        })
        .unwrap();
        assert_eq!(dst, vec![10, 10, 10, 11, 11, 11]);
    }

    #[test]
    fn test_rows_fixed_success() {
        let mut dst = vec![1u8; 8];
        for_each_pixel_mut::<4, _>(ExecutionStrategy::Fixed(2), &mut dst, 4, |px| {
            px[0] = 9;
        })
        .unwrap();
        assert_eq!(dst, vec![9, 1, 1, 1, 9, 1, 1, 1]);
    }

    #[test]
    fn test_rows_fixed_error() {
        let mut dst = vec![0u8; 4];
        let res = for_each_row_mut(ExecutionStrategy::Fixed(0), &mut dst, 4, |_, _| {});
        assert!(matches!(res, Err(ParallelError::InvalidThreadCount(0))));
    }

    #[test]
    fn test_install_runs_passes_on_one_pool() {
        let mut dst = vec![0u8; 12];
        let threads = install(ExecutionStrategy::Fixed(2), |strategy| {
            assert_eq!(strategy, ExecutionStrategy::ParallelRows);
            for _ in 0..2 {
                for_each_row_mut(strategy, &mut dst, 4, |r, row| {
                    row.iter_mut().for_each(|v| *v += r as u8 + 1);
                })
                .unwrap();
            }
            rayon::current_num_threads()
        })
        .unwrap();
        assert_eq!(threads, 2);
        assert_eq!(dst, vec![2, 2, 2, 2, 4, 4, 4, 4, 6, 6, 6, 6]);

        let strategy = install(ExecutionStrategy::Serial, |strategy| strategy).unwrap();
        assert_eq!(strategy, ExecutionStrategy::Serial);

        let res = install(ExecutionStrategy::Fixed(0), |_| ());
        assert_eq!(res, Err(ParallelError::InvalidThreadCount(0)));
    }

    #[test]
    fn test_rows_invalid_stride() {
        let mut dst = vec![0u8; 5];
        let res = for_each_row_mut(ExecutionStrategy::Serial, &mut dst, 4, |_, _| {});
        assert_eq!(res, Err(ParallelError::InvalidRowStride(5, 4)));
    }

    #[test]
    fn test_rows_empty() {
        let mut dst: Vec<u8> = vec![];
        let res = for_each_row_mut(ExecutionStrategy::Serial, &mut dst, 0, |_, _| {});
        assert!(res.is_ok());
    }
}
