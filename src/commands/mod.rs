// Directory listings
pub mod list;
pub mod stats;

// Assignment workflows
pub mod assign;
pub mod clear;
pub mod interactive;

// Session and configuration
pub mod config;
pub mod login;

use anyhow::{Context as _, Result, bail};
use dialoguer::Confirm;

use assignment::{BatchResult, ExecuteError, ExecuteOptions, Executor, Plan, RemoteDirectory};

use crate::progress::BatchProgress;
use crate::{Context, ui};

/// Apply a plan with a progress bar and print the summary.
///
/// A batch stopped by repeated authentication failures is reported with its
/// partial result and returned as an error.
pub fn execute_plan(
    ctx: &Context,
    directory: &dyn RemoteDirectory,
    plan: &Plan,
    options: ExecuteOptions,
) -> Result<BatchResult> {
    let mut progress = BatchProgress::new(ctx.quiet);
    let executor = Executor::new(directory, options);

    match executor.execute(plan, &mut progress) {
        Ok(result) => {
            ui::print_summary(&result);
            Ok(result)
        }
        Err(ExecuteError::Authentication { message, partial }) => {
            ui::print_summary(&partial);
            ui::error(&format!("Stopped: {message}"));
            ui::dim("Run `intune-tools login` and retry the remaining assignments.");
            bail!(
                "authentication failed after {} of {} assignments",
                partial.attempted(),
                partial.total
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// Error out if any pair of the batch failed
pub fn ensure_success(result: &BatchResult) -> Result<()> {
    if !result.is_success() {
        bail!("{} of {} assignments failed", result.failure, result.total);
    }
    Ok(())
}

/// Confirm with user
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("Failed to read user input")
}
