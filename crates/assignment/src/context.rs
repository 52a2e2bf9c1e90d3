//! Progress reporting for batch execution
//!
//! The executor reports through this trait so the crate stays free of any
//! particular terminal UI.

use crate::error::RemoteError;
use crate::types::PlannedAssignment;

/// Progress callback for batch execution
///
/// With more than one job, `on_pair_start` and `on_pair_complete` are
/// called from worker threads, serialized by the executor.
pub trait ProgressCallback: Send {
    /// Called once before the first pair is attempted
    fn on_batch_start(&mut self, total: usize);

    /// Called when starting to apply a single pair
    fn on_pair_start(&mut self, index: usize, assignment: &PlannedAssignment);

    /// Called when a pair completes, with its outcome
    fn on_pair_complete(
        &mut self,
        index: usize,
        assignment: &PlannedAssignment,
        outcome: Result<(), &RemoteError>,
    );

    /// Called once after the last pair
    fn on_batch_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _total: usize) {}
    fn on_pair_start(&mut self, _index: usize, _assignment: &PlannedAssignment) {}
    fn on_pair_complete(
        &mut self,
        _index: usize,
        _assignment: &PlannedAssignment,
        _outcome: Result<(), &RemoteError>,
    ) {
    }
    fn on_batch_complete(&mut self) {}
}

impl<P: ProgressCallback + ?Sized> ProgressCallback for &mut P {
    fn on_batch_start(&mut self, total: usize) {
        (**self).on_batch_start(total);
    }

    fn on_pair_start(&mut self, index: usize, assignment: &PlannedAssignment) {
        (**self).on_pair_start(index, assignment);
    }

    fn on_pair_complete(
        &mut self,
        index: usize,
        assignment: &PlannedAssignment,
        outcome: Result<(), &RemoteError>,
    ) {
        (**self).on_pair_complete(index, assignment, outcome);
    }

    fn on_batch_complete(&mut self) {
        (**self).on_batch_complete();
    }
}
