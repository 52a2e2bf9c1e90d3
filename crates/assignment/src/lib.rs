//! # Assignment
//!
//! Bulk reconciliation of app-to-group assignments for a device management
//! directory.
//!
//! A caller builds up a [`Selection`] of groups and apps, turns it into an
//! immutable [`Plan`] with the [`Planner`], shows a [`PreviewSummary`], and
//! applies the plan with the [`Executor`], which always yields a complete
//! [`BatchResult`].
//!
//! ## Core Concepts
//!
//! - **Selection**: the groups and apps picked so far, plus intent and options
//! - **Plan**: the (group, app) work items, group-major, deduplicated
//! - **Executor**: applies a plan sequentially or on a bounded worker pool
//! - **RemoteDirectory**: the only seam to the outside world
//!
//! ## Example
//!
//! ```
//! use assignment::{
//!     ExecuteOptions, Executor, InMemoryDirectory, NoProgress, Planner, Selection,
//! };
//!
//! let directory = InMemoryDirectory::new();
//!
//! let mut selection = Selection::new();
//! selection.toggle_group("G1");
//! selection.toggle_group("G2");
//! selection.toggle_app("A1");
//!
//! let plan = Planner::new(&directory).plan_selection(&selection)?;
//! assert_eq!(plan.len(), 2);
//!
//! let result = Executor::new(&directory, ExecuteOptions::default())
//!     .execute(&plan, &mut NoProgress)?;
//! assert_eq!((result.total, result.success, result.failure), (2, 2, 0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Directory access is injected through [`RemoteDirectory`], so the same
//! planner and executor drive a live tenant, the in-memory demo data, and
//! tests.

pub mod context;
pub mod directory;
pub mod error;
pub mod executor;
pub mod memory;
pub mod planner;
pub mod preview;
pub mod selection;
pub mod stats;
pub mod types;

pub use context::{NoProgress, ProgressCallback};
pub use directory::{AppFilter, GroupFilter, PlatformFilter, RemoteDirectory};
pub use error::{ExecuteError, OptionError, PlanError, RemoteError};
pub use executor::{ExecuteOptions, Executor, execute_simple};
pub use memory::InMemoryDirectory;
pub use planner::{DedupKey, ExistingIndex, Plan, Planner, SatisfiedPair, build_plan};
pub use preview::{preview, preview_selection};
pub use selection::Selection;
pub use stats::{AppStats, GroupStats};
pub use types::{
    AppType, Application, AssignmentFailure, AssignmentOptions, AssignmentSettings, BatchResult,
    ExistingAssignment, Group, GroupKind, Intent, Notifications, PlannedAssignment,
    PreviewSummary, RemoteErrorKind, TargetKind,
};
