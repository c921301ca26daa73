//! Bounded worker pool
//!
//! Runs a function over a slice of jobs on at most `workers` scoped threads.
//! Workers claim jobs through a shared counter. Results come back in job
//! order regardless of completion order.

use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Run `f` over every job, in parallel, bounded by `workers`
///
/// The first failure raises an abort flag: no further jobs are claimed,
/// jobs already running finish, and the error of the lowest failing job
/// index is returned. A panic in `f` is propagated to the caller.
pub fn run_bounded<T, R, E, F>(jobs: &[T], workers: usize, f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, jobs.len());
    if workers == 1 {
        return jobs.iter().map(&f).collect();
    }

    let next = AtomicUsize::new(0);
    let aborted = AtomicBool::new(false);

    let outcomes: Vec<Result<Vec<(usize, R)>, (usize, E)>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    while !aborted.load(Ordering::Acquire) {
                        let index = next.fetch_add(1, Ordering::AcqRel);
                        let Some(job) = jobs.get(index) else {
                            break;
                        };
                        match f(job) {
                            Ok(result) => done.push((index, result)),
                            Err(err) => {
                                aborted.store(true, Ordering::Release);
                                return Err((index, err));
                            }
                        }
                    }
                    Ok(done)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    });

    let mut results = Vec::with_capacity(jobs.len());
    let mut first_error: Option<(usize, E)> = None;
    for outcome in outcomes {
        match outcome {
            Ok(done) => results.extend(done),
            Err((index, err)) => {
                if first_error.as_ref().map_or(true, |(first, _)| index < *first) {
                    first_error = Some((index, err));
                }
            }
        }
    }

    if let Some((_, err)) = first_error {
        return Err(err);
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

/// Default worker count: the available parallelism of the host
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
