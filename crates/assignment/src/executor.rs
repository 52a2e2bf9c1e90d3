//! Execution engine - applies a plan pair by pair, isolating failures

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::context::{NoProgress, ProgressCallback};
use crate::directory::RemoteDirectory;
use crate::error::{ExecuteError, RemoteError};
use crate::planner::Plan;
use crate::types::{AssignmentFailure, BatchResult, PlannedAssignment};

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of concurrent remote calls; 1 means strictly sequential
    pub jobs: usize,
    /// Stop the batch after this many consecutive authentication failures.
    /// `None` attempts every pair regardless.
    pub auth_failure_limit: Option<usize>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            auth_failure_limit: Some(3),
        }
    }
}

impl ExecuteOptions {
    pub fn sequential() -> Self {
        Self {
            jobs: 1,
            ..Default::default()
        }
    }
}

/// Applies plans against a directory
pub struct Executor<'a, D: RemoteDirectory + ?Sized> {
    directory: &'a D,
    options: ExecuteOptions,
}

impl<'a, D: RemoteDirectory + ?Sized> Executor<'a, D> {
    pub fn new(directory: &'a D, options: ExecuteOptions) -> Self {
        Self { directory, options }
    }

    /// Attempt every pair of `plan` once and account for the outcome.
    ///
    /// Per-pair failures are recorded in the returned [`BatchResult`] and
    /// never stop the batch. The only early exit is repeated authentication
    /// failure, reported as [`ExecuteError::Authentication`] with the
    /// partial result.
    pub fn execute<P: ProgressCallback>(
        &self,
        plan: &Plan,
        progress: &mut P,
    ) -> Result<BatchResult, ExecuteError> {
        let mut result = BatchResult::new(plan.len());
        if plan.is_empty() {
            return Ok(result);
        }

        let guard = AuthGuard::new(self.options.auth_failure_limit);

        progress.on_batch_start(plan.len());
        if self.options.jobs <= 1 || plan.len() == 1 {
            self.execute_sequential(plan, &guard, progress, &mut result);
        } else {
            result = self.execute_parallel(plan, &guard, progress)?;
        }
        progress.on_batch_complete();

        log::info!(
            "Batch complete: {} succeeded, {} failed, {} total",
            result.success,
            result.failure,
            result.total
        );

        match guard.into_tripped() {
            Some(message) => Err(ExecuteError::Authentication {
                message,
                partial: result,
            }),
            None => Ok(result),
        }
    }

    fn execute_sequential<P: ProgressCallback>(
        &self,
        plan: &Plan,
        guard: &AuthGuard,
        progress: &mut P,
        result: &mut BatchResult,
    ) {
        for (index, assignment) in plan.iter().enumerate() {
            if guard.is_tripped() {
                break;
            }
            progress.on_pair_start(index, assignment);
            let outcome = self.apply(assignment);
            guard.observe(&outcome);
            progress.on_pair_complete(index, assignment, outcome.as_ref().map(|_| ()));
            record(result, index, assignment, outcome);
        }
    }

    /// Execute pairs on a bounded rayon pool; failures are re-sorted by plan index
    fn execute_parallel<P: ProgressCallback>(
        &self,
        plan: &Plan,
        guard: &AuthGuard,
        progress: &mut P,
    ) -> Result<BatchResult, ExecuteError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
            .map_err(|e| ExecuteError::WorkerPool(e.to_string()))?;

        let result = Mutex::new(BatchResult::new(plan.len()));
        let progress = Mutex::new(progress);

        pool.install(|| {
            plan.assignments()
                .par_iter()
                .enumerate()
                .for_each(|(index, assignment)| {
                    if guard.is_tripped() {
                        return;
                    }
                    lock(&progress).on_pair_start(index, assignment);
                    let outcome = self.apply(assignment);
                    guard.observe(&outcome);
                    lock(&progress).on_pair_complete(
                        index,
                        assignment,
                        outcome.as_ref().map(|_| ()),
                    );
                    record(&mut lock(&result), index, assignment, outcome);
                });
        });

        let mut result = match result.into_inner() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        result.sort_failures();
        Ok(result)
    }

    fn apply(&self, assignment: &PlannedAssignment) -> Result<(), RemoteError> {
        self.directory.create_assignment(
            &assignment.app_id,
            &assignment.group_id,
            assignment.intent,
            &assignment.options.settings(),
        )
    }
}

fn record(
    result: &mut BatchResult,
    index: usize,
    assignment: &PlannedAssignment,
    outcome: Result<(), RemoteError>,
) {
    match outcome {
        Ok(()) => {
            log::info!(
                "Assigned app {} to group {} ({})",
                assignment.app_id,
                assignment.group_id,
                assignment.intent
            );
            result.record_success();
        }
        Err(e) => {
            log::warn!(
                "Failed to assign app {} to group {}: {}",
                assignment.app_id,
                assignment.group_id,
                e
            );
            result.record_failure(AssignmentFailure {
                index,
                group_id: assignment.group_id.clone(),
                app_id: assignment.app_id.clone(),
                message: e.message,
                kind: e.kind,
            });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Tracks consecutive authentication failures across workers
struct AuthGuard {
    limit: Option<usize>,
    consecutive: AtomicUsize,
    tripped: AtomicBool,
    message: Mutex<Option<String>>,
}

impl AuthGuard {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            consecutive: AtomicUsize::new(0),
            tripped: AtomicBool::new(false),
            message: Mutex::new(None),
        }
    }

    fn observe(&self, outcome: &Result<(), RemoteError>) {
        let Some(limit) = self.limit else {
            return;
        };

        match outcome {
            Err(e) if e.is_authentication() => {
                let count = self.consecutive.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= limit && !self.tripped.swap(true, Ordering::SeqCst) {
                    log::warn!(
                        "Stopping batch after {} consecutive authentication failures",
                        count
                    );
                    *lock(&self.message) = Some(e.message.clone());
                }
            }
            _ => self.consecutive.store(0, Ordering::SeqCst),
        }
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    fn into_tripped(self) -> Option<String> {
        if !self.tripped.load(Ordering::SeqCst) {
            return None;
        }
        let message = match self.message.into_inner() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(message.unwrap_or_else(|| "authentication failed".to_string()))
    }
}

/// Execute a plan without progress reporting
pub fn execute_simple<D: RemoteDirectory + ?Sized>(
    directory: &D,
    plan: &Plan,
    options: ExecuteOptions,
) -> Result<BatchResult, ExecuteError> {
    Executor::new(directory, options).execute(plan, &mut NoProgress)
}
