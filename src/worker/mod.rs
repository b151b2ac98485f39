//! Off-thread render backends
//!
//! - [`ThreadWorker`]: one background thread renders whole frames
//! - [`WorkerPool`]: the image is split into row bands, one per thread; each
//!   thread draws every line but only writes inside its band
//! - [`ProcessWorker`]: a child process (`linebench --worker`) renders frames
//!   sent as JSON lines
//!
//! The wire format in [`protocol`] is always available so the binary can
//! act as a worker without the `workers` feature.

pub mod protocol;

#[cfg(feature = "workers")]
mod pool;
#[cfg(feature = "workers")]
mod process;
#[cfg(feature = "workers")]
mod thread;

#[cfg(feature = "workers")]
pub use pool::WorkerPool;
#[cfg(feature = "workers")]
pub use process::ProcessWorker;
#[cfg(feature = "workers")]
pub use thread::ThreadWorker;

/// Threads to use for a configured worker count (0 => one per CPU)
#[cfg(feature = "workers")]
pub fn effective_workers(configured: usize) -> usize {
    if configured == 0 {
        num_cpus::get().max(1)
    } else {
        configured
    }
}

#[cfg(all(test, feature = "workers"))]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_means_one_per_cpu() {
        assert_eq!(effective_workers(3), 3);
        assert!(effective_workers(0) >= 1);
    }
}
