//! The executor capability.
//!
//! The pass needs exactly one scheduling primitive: run N independent jobs,
//! block until all complete, and surface a failing job's error. Callers pick
//! the implementation; nothing here owns threads beyond a single `run` call.

use rayon::prelude::*;

/// Runs independent, index-addressed jobs to completion.
pub trait Executor: Sync {
    /// Run `jobs` invocations of `job` (with indexes `0..jobs`), blocking
    /// until all have finished. If any job fails, one of the failures is
    /// returned; remaining jobs may or may not have run.
    fn run<E: Send>(
        &self,
        jobs: usize,
        job: &(dyn Fn(usize) -> Result<(), E> + Sync),
    ) -> Result<(), E>;
}

/// Work-stealing parallel executor. The default for production runs.
#[derive(Default)]
pub struct RayonExecutor;

impl Executor for RayonExecutor {
    fn run<E: Send>(
        &self,
        jobs: usize,
        job: &(dyn Fn(usize) -> Result<(), E> + Sync),
    ) -> Result<(), E> {
        (0..jobs).into_par_iter().try_for_each(job)
    }
}

/// In-order single-threaded executor, stopping at the first failure. Used in
/// tests and when debugging nondeterminism suspicions.
#[derive(Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn run<E: Send>(
        &self,
        jobs: usize,
        job: &(dyn Fn(usize) -> Result<(), E> + Sync),
    ) -> Result<(), E> {
        (0..jobs).try_for_each(job)
    }
}
