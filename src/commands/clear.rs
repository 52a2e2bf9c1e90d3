use anyhow::{Context as _, Result};

use assignment::RemoteDirectory;

use super::confirm;
use crate::session;
use crate::{Context, ui};

pub fn run(ctx: &Context, app_id: &str, yes: bool) -> Result<()> {
    let directory = session::open_directory(ctx, false)?;
    let existing = directory
        .list_assignments(app_id)
        .with_context(|| format!("Failed to list assignments for app {app_id}"))?;

    if existing.is_empty() {
        ui::info(&format!("App {app_id} has no assignments"));
        return Ok(());
    }

    ui::warn(&format!(
        "This removes all {} assignments of app {app_id}",
        existing.len()
    ));
    if !yes && !confirm("Continue?", false)? {
        ui::info("Aborted. No changes made.");
        return Ok(());
    }

    let removed = directory
        .clear_assignments(app_id)
        .with_context(|| format!("Failed to clear assignments for app {app_id}"))?;
    ui::success(&format!("Removed {removed} assignments"));
    Ok(())
}
