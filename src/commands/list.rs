use anyhow::{Context as _, Result};
use std::collections::HashMap;

use assignment::{AppFilter, GroupFilter, GroupKind, PlatformFilter, RemoteDirectory};

use crate::cli::AppsArgs;
use crate::session;
use crate::{Context, ui};

pub fn groups(ctx: &Context, kind: Option<GroupKind>, filter: Option<String>) -> Result<()> {
    let directory = session::open_directory(ctx, true)?;
    let all = directory.list_groups().context("Failed to list groups")?;
    let total = all.len();

    let groups = GroupFilter { name: filter, kind }.apply(all);

    ui::header(&format!("Groups ({} of {})", groups.len(), total));
    if groups.is_empty() {
        ui::dim("No groups match");
        return Ok(());
    }
    for group in &groups {
        ui::print_group(group);
    }
    Ok(())
}

pub fn apps(ctx: &Context, args: AppsArgs) -> Result<()> {
    let platform = if args.all_platforms {
        PlatformFilter::All
    } else {
        PlatformFilter::MacOs
    };

    let directory = session::open_directory(ctx, false)?;
    let all = directory.list_apps(platform).context("Failed to list apps")?;
    let total = all.len();

    let filter = AppFilter {
        name: args.filter,
        publisher: args.publisher,
        app_type: args.app_type,
    };
    let apps = filter.apply(all);

    let title = match platform {
        PlatformFilter::MacOs => "macOS Apps",
        PlatformFilter::All => "Apps",
    };
    ui::header(&format!("{title} ({} of {})", apps.len(), total));
    if apps.is_empty() {
        ui::dim("No apps match");
        return Ok(());
    }
    for app in &apps {
        ui::print_app(app);
    }
    Ok(())
}

pub fn assignments(ctx: &Context, app_id: &str) -> Result<()> {
    let directory = session::open_directory(ctx, false)?;
    let existing = directory
        .list_assignments(app_id)
        .with_context(|| format!("Failed to list assignments for app {app_id}"))?;

    // Names are a convenience; ids are shown when the group list is unavailable
    let names: HashMap<String, String> = match directory.list_groups() {
        Ok(groups) => groups
            .into_iter()
            .map(|g| (g.id, g.display_name))
            .collect(),
        Err(e) => {
            log::warn!("Could not load group names: {e}");
            HashMap::new()
        }
    };

    ui::header(&format!("Assignments of {app_id} ({})", existing.len()));
    if existing.is_empty() {
        ui::dim("No assignments");
        return Ok(());
    }
    for assignment in &existing {
        let name = assignment
            .group_id
            .as_ref()
            .and_then(|id| names.get(id))
            .map(String::as_str);
        ui::print_existing(assignment, name);
    }
    Ok(())
}
