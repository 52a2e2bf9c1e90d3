use anyhow::{Context as _, Result};
use std::collections::HashSet;

use assignment::{Application, Group, PlatformFilter, Planner, RemoteDirectory, preview};

use super::{confirm, ensure_success, execute_plan};
use crate::cli::AssignArgs;
use crate::session;
use crate::{Context, ui};

pub fn run(ctx: &Context, args: AssignArgs) -> Result<()> {
    let mut options = ctx.config.assignment_options();
    options
        .apply_pairs(args.options.iter().map(String::as_str))
        .context("Invalid --option")?;
    let intent = args.intent.map_or(ctx.config.assign.intent, Into::into);
    let dedup = args.dedup.map_or(ctx.config.assign.dedup, Into::into);
    let mut execute_options = ctx.config.execute_options();
    if let Some(jobs) = args.jobs {
        execute_options.jobs = jobs.max(1);
    }

    let directory = session::open_directory(ctx, false)?;
    let (known_groups, known_apps) = snapshot(directory.as_ref());
    warn_unknown(&args.groups, &known_groups, "group", |g| &g.id);
    warn_unknown(&args.apps, &known_apps, "app", |a| &a.id);

    let summary = preview(&args.groups, &args.apps, intent, &known_groups, &known_apps);
    ui::print_preview(&summary);

    let plan = Planner::new(directory.as_ref())
        .with_dedup(dedup)
        .plan(&args.groups, &args.apps, intent, options)?;
    ui::print_plan(&plan);

    if plan.is_empty() {
        println!();
        ui::success("Every selected app is already assigned; nothing to do");
        return Ok(());
    }

    if args.preview {
        println!();
        ui::info("Preview only; no changes made");
        return Ok(());
    }

    if !args.yes {
        println!();
        let prompt = format!("Create {} assignments?", plan.len());
        if !confirm(&prompt, false)? {
            ui::info("Aborted. No changes made.");
            return Ok(());
        }
    }

    let result = execute_plan(ctx, directory.as_ref(), &plan, execute_options)?;
    ensure_success(&result)
}

/// Groups and apps for display names; listing failures only cost the names
fn snapshot(directory: &dyn RemoteDirectory) -> (Vec<Group>, Vec<Application>) {
    let groups = directory.list_groups().unwrap_or_else(|e| {
        log::warn!("Could not load group names: {e}");
        Vec::new()
    });
    let apps = directory.list_apps(PlatformFilter::All).unwrap_or_else(|e| {
        log::warn!("Could not load app names: {e}");
        Vec::new()
    });
    (groups, apps)
}

fn warn_unknown<T>(ids: &[String], known: &[T], what: &str, id_of: impl Fn(&T) -> &String) {
    if known.is_empty() {
        return;
    }
    let known: HashSet<&String> = known.iter().map(id_of).collect();
    for id in ids.iter().filter(|id| !known.contains(id)) {
        ui::warn(&format!("Unknown {what} id {id}"));
    }
}
