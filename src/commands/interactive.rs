//! Group-first interactive workflow.
//!
//! Groups and apps are fetched once, then the user edits a [`Selection`]
//! from a menu until they apply or quit. Nothing is sent to the directory
//! before "Apply" is confirmed.

use anyhow::{Context as _, Result, bail};
use std::collections::BTreeSet;

use dialoguer::{Input, MultiSelect, Select};

use assignment::{
    AppFilter, Application, Group, GroupFilter, Intent, Plan, PlatformFilter, Planner,
    RemoteDirectory, Selection, preview_selection,
};

use super::{confirm, execute_plan};
use crate::session;
use crate::{Context, ui};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Groups,
    Apps,
    Intent,
    Options,
    Preview,
    Apply,
    Clear,
    Quit,
}

impl Action {
    const MENU: [Self; 8] = [
        Self::Groups,
        Self::Apps,
        Self::Intent,
        Self::Options,
        Self::Preview,
        Self::Apply,
        Self::Clear,
        Self::Quit,
    ];

    fn label(self, selection: &Selection) -> String {
        let options = selection.options();
        match self {
            Self::Groups => format!("Select groups ({} selected)", selection.groups().len()),
            Self::Apps => format!("Select apps ({} selected)", selection.apps().len()),
            Self::Intent => format!("Intent: {}", selection.intent()),
            Self::Options => format!(
                "Options: notify {}, restart {}, override {}",
                on_off(options.notify),
                on_off(options.restart_required),
                on_off(options.override_existing)
            ),
            Self::Preview => format!("Preview ({} assignments)", selection.plan_count()),
            Self::Apply => "Apply".to_string(),
            Self::Clear => "Clear selection".to_string(),
            Self::Quit => "Quit".to_string(),
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Result of one visit to a group or app picker
#[derive(Debug, PartialEq, Eq)]
enum Pick {
    /// Flip the membership of these ids
    Toggle(Vec<String>),
    /// Add every visible id
    SelectAll(Vec<String>),
    Clear,
    Back,
}

pub fn run(ctx: &Context) -> Result<()> {
    let directory = session::open_directory(ctx, true)?;

    ui::info("Loading groups and apps...");
    let groups = directory.list_groups().context("Failed to list groups")?;
    let apps = directory
        .list_apps(PlatformFilter::MacOs)
        .context("Failed to list apps")?;
    ui::success(&format!(
        "Loaded {} groups and {} macOS apps",
        groups.len(),
        apps.len()
    ));

    if groups.is_empty() || apps.is_empty() {
        ui::warn("Nothing to assign: need at least one group and one macOS app");
        return Ok(());
    }

    let mut selection =
        Selection::with_settings(ctx.config.assign.intent, ctx.config.assignment_options());
    let mut outstanding_failures = 0;

    loop {
        println!();
        let labels: Vec<String> = Action::MENU.iter().map(|a| a.label(&selection)).collect();
        let choice = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()
            .context("Failed to read menu choice")?;

        match Action::MENU[choice] {
            Action::Groups => {
                let pick = pick_groups(&groups, &selection)?;
                apply_group_pick(&mut selection, pick);
            }
            Action::Apps => {
                let pick = pick_apps(&apps, &selection)?;
                apply_app_pick(&mut selection, pick);
            }
            Action::Intent => choose_intent(&mut selection)?,
            Action::Options => edit_options(&mut selection)?,
            Action::Preview => {
                ui::print_preview(&preview_selection(&selection, &groups, &apps));
            }
            Action::Apply => {
                if selection.is_empty() {
                    ui::warn("Select at least one group and one app first");
                    continue;
                }
                let batch = apply(ctx, directory.as_ref(), &selection, &groups, &apps)?;
                outstanding_failures = remaining_failures(outstanding_failures, batch);
            }
            Action::Clear => {
                selection.clear();
                ui::info("Selection cleared");
            }
            Action::Quit => break,
        }
    }

    if outstanding_failures > 0 {
        bail!("{outstanding_failures} assignments failed");
    }
    Ok(())
}

// ============================================================================
// Pickers
// ============================================================================

fn ask_filter() -> Result<String> {
    Input::new()
        .with_prompt("Filter by name (empty for all)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read filter")
}

fn pick_groups(groups: &[Group], selection: &Selection) -> Result<Pick> {
    let filter = GroupFilter {
        name: Some(ask_filter()?).filter(|f| !f.is_empty()),
        kind: None,
    };
    let visible: Vec<(String, String)> = groups
        .iter()
        .filter(|g| filter.matches(g))
        .map(|g| (g.id.clone(), ui::group_line(g)))
        .collect();
    choose("groups", &visible, selection.groups())
}

fn pick_apps(apps: &[Application], selection: &Selection) -> Result<Pick> {
    let filter = AppFilter {
        name: Some(ask_filter()?).filter(|f| !f.is_empty()),
        ..Default::default()
    };
    let visible: Vec<(String, String)> = apps
        .iter()
        .filter(|a| filter.matches(a))
        .map(|a| (a.id.clone(), ui::app_line(a)))
        .collect();
    choose("apps", &visible, selection.apps())
}

/// Let the user act on the visible `(id, label)` entries
fn choose(what: &str, visible: &[(String, String)], selected: &BTreeSet<String>) -> Result<Pick> {
    if visible.is_empty() {
        ui::warn(&format!("No {what} match the filter"));
        return Ok(Pick::Back);
    }

    let actions = [
        format!("Toggle {what} individually"),
        format!("Select all {} shown", visible.len()),
        format!("Clear selected {what}"),
        "Back".to_string(),
    ];
    let action = Select::new()
        .with_prompt(format!("{} {what} shown", visible.len()))
        .items(&actions)
        .default(0)
        .interact()
        .context("Failed to read choice")?;

    match action {
        0 => {
            let labels: Vec<&str> = visible.iter().map(|(_, label)| label.as_str()).collect();
            let checked: Vec<bool> = visible.iter().map(|(id, _)| selected.contains(id)).collect();
            let chosen = MultiSelect::new()
                .with_prompt("Space to toggle, Enter to confirm")
                .items(&labels)
                .defaults(&checked)
                .interact()
                .context("Failed to read selection")?;
            Ok(Pick::Toggle(toggled_ids(visible, &checked, &chosen)))
        }
        1 => Ok(Pick::SelectAll(
            visible.iter().map(|(id, _)| id.clone()).collect(),
        )),
        2 => Ok(Pick::Clear),
        _ => Ok(Pick::Back),
    }
}

/// Ids whose checked state differs between `before` and the `chosen` indices
fn toggled_ids(visible: &[(String, String)], before: &[bool], chosen: &[usize]) -> Vec<String> {
    visible
        .iter()
        .zip(before)
        .enumerate()
        .filter(|(index, (_, was))| chosen.contains(index) != **was)
        .map(|(_, ((id, _), _))| id.clone())
        .collect()
}

fn apply_group_pick(selection: &mut Selection, pick: Pick) {
    match pick {
        Pick::Toggle(ids) => {
            for id in &ids {
                selection.toggle_group(id);
            }
        }
        Pick::SelectAll(ids) => selection.select_all_groups(ids),
        Pick::Clear => selection.clear_groups(),
        Pick::Back => {}
    }
}

fn apply_app_pick(selection: &mut Selection, pick: Pick) {
    match pick {
        Pick::Toggle(ids) => {
            for id in &ids {
                selection.toggle_app(id);
            }
        }
        Pick::SelectAll(ids) => selection.select_all_apps(ids),
        Pick::Clear => selection.clear_apps(),
        Pick::Back => {}
    }
}

// ============================================================================
// Intent and options
// ============================================================================

fn choose_intent(selection: &mut Selection) -> Result<()> {
    let labels: Vec<&str> = Intent::ALL.iter().map(Intent::as_str).collect();
    let current = Intent::ALL
        .iter()
        .position(|i| *i == selection.intent())
        .unwrap_or(0);
    let index = Select::new()
        .with_prompt("Intent")
        .items(&labels)
        .default(current)
        .interact()
        .context("Failed to read intent")?;
    selection.set_intent(Intent::ALL[index]);
    Ok(())
}

fn edit_options(selection: &mut Selection) -> Result<()> {
    let options = selection.options_mut();
    let labels = [
        "Show notifications",
        "Require restart",
        "Override existing assignments",
    ];
    let checked = [
        options.notify,
        options.restart_required,
        options.override_existing,
    ];
    let chosen = MultiSelect::new()
        .with_prompt("Assignment options")
        .items(&labels)
        .defaults(&checked)
        .interact()
        .context("Failed to read options")?;

    options.notify = chosen.contains(&0);
    options.restart_required = chosen.contains(&1);
    options.override_existing = chosen.contains(&2);
    Ok(())
}

// ============================================================================
// Apply
// ============================================================================

/// Failures left unresolved after an Apply; `batch` is `None` when nothing ran
fn remaining_failures(previous: usize, batch: Option<usize>) -> usize {
    batch.unwrap_or(previous)
}

/// Plan, confirm and execute the selection.
///
/// Returns the failures left over, or `None` when no batch was executed.
fn apply(
    ctx: &Context,
    directory: &dyn RemoteDirectory,
    selection: &Selection,
    groups: &[Group],
    apps: &[Application],
) -> Result<Option<usize>> {
    ui::print_preview(&preview_selection(selection, groups, apps));

    let plan = match Planner::new(directory)
        .with_dedup(ctx.config.assign.dedup)
        .plan_selection(selection)
    {
        Ok(plan) => plan,
        Err(e) => {
            ui::error(&e.to_string());
            return Ok(None);
        }
    };
    ui::print_plan(&plan);

    if plan.is_empty() {
        println!();
        ui::success("Every selected app is already assigned; nothing to do");
        return Ok(None);
    }

    println!();
    if !confirm(&format!("Create {} assignments?", plan.len()), false)? {
        ui::info("Aborted. No changes made.");
        return Ok(None);
    }

    let mut current: Plan = plan;
    loop {
        let result = execute_plan(ctx, directory, &current, ctx.config.execute_options())?;
        if result.is_success() {
            return Ok(Some(0));
        }

        println!();
        let retry = format!("Retry {} failed assignments?", result.failure);
        if !confirm(&retry, false)? {
            return Ok(Some(result.failure));
        }
        current = current.retry_failed(&result);
    }
}
