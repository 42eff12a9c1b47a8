// src/engine/pool.rs
//
// Global thread pool for static row-chunk stages.
//
// A single process-wide rayon pool is shared by every stage that splits its
// output into row ranges. Building a pool per stage would add several ms per
// request; the shared pool is built once and reused.
//
// - Pool is initialized lazily on first use
// - Thread count comes from std::thread::available_parallelism(), which
//   respects cgroup/CPU quotas
// - Changes to the environment after initialization have NO effect

use rayon::ThreadPool;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Minimum number of rayon threads to ensure at least some parallelism
const MIN_RAYON_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Shared pool for row-chunk work, or `None` if no pool could be built.
///
/// Callers run sequentially when this returns `None`; output is the same
/// either way.
pub fn get_pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_RAYON_THREADS)
                .max(MIN_RAYON_THREADS);

            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("raster-rows-{i}"))
                .build()
            {
                Ok(pool) => {
                    debug!(threads = num_threads, "built row-chunk thread pool");
                    Some(pool)
                }
                Err(e) => {
                    warn!(error = %e, "failed to build row-chunk pool, running sequentially");
                    None
                }
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_shared() {
        let a = get_pool().map(|p| p as *const ThreadPool);
        let b = get_pool().map(|p| p as *const ThreadPool);
        assert_eq!(a, b);
        if let Some(pool) = get_pool() {
            assert!(pool.current_num_threads() >= MIN_RAYON_THREADS);
        }
    }
}
