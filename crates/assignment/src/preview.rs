//! Preview - read-only summary of what a batch would do

use std::collections::HashSet;

use crate::selection::Selection;
use crate::types::{Application, Group, Intent, PreviewSummary};

/// Summarize a selection against already-fetched directory snapshots.
///
/// Names follow the snapshot order. Selected identifiers missing from the
/// snapshot are appended by id, in selection order. No remote calls are made.
pub fn preview<G, A, S, T>(
    groups: G,
    apps: A,
    intent: Intent,
    known_groups: &[Group],
    known_apps: &[Application],
) -> PreviewSummary
where
    G: IntoIterator<Item = S>,
    A: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let group_ids = distinct(groups);
    let app_ids = distinct(apps);

    let group_names = resolve_names(
        &group_ids,
        known_groups
            .iter()
            .map(|g| (g.id.as_str(), g.display_name.as_str())),
    );
    let app_names = resolve_names(
        &app_ids,
        known_apps
            .iter()
            .map(|a| (a.id.as_str(), a.display_name.as_str())),
    );

    PreviewSummary {
        total_pairs: group_ids.len() * app_ids.len(),
        intent,
        group_names,
        app_names,
    }
}

/// Preview the current state of a [`Selection`]
pub fn preview_selection(
    selection: &Selection,
    known_groups: &[Group],
    known_apps: &[Application],
) -> PreviewSummary {
    preview(
        selection.groups(),
        selection.apps(),
        selection.intent(),
        known_groups,
        known_apps,
    )
}

fn distinct<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn resolve_names<'a>(
    selected: &[String],
    snapshot: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<String> {
    let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let mut found = HashSet::new();
    let mut names = Vec::with_capacity(selected.len());

    for (id, name) in snapshot {
        if wanted.contains(id) && found.insert(id) {
            names.push(name.to_string());
        }
    }

    names.extend(
        selected
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned(),
    );
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppType, GroupKind};

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            display_name: name.to_string(),
            description: None,
            member_count: 0,
            kind: GroupKind::Security,
        }
    }

    fn app(id: &str, name: &str) -> Application {
        Application {
            id: id.to_string(),
            display_name: name.to_string(),
            publisher: None,
            version: None,
            app_type: AppType::MacOsPkg,
            size_bytes: 0,
            created: None,
            last_modified: None,
        }
    }

    #[test]
    fn test_names_follow_snapshot_order() {
        let groups = vec![group("g2", "Beta"), group("g1", "Alpha"), group("g3", "Gamma")];
        let apps = vec![app("a1", "Slack")];

        let summary = preview(["g1", "g2"], ["a1"], Intent::Available, &groups, &apps);

        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.intent, Intent::Available);
        assert_eq!(summary.group_names, vec!["Beta", "Alpha"]);
        assert_eq!(summary.app_names, vec!["Slack"]);
    }

    #[test]
    fn test_unknown_ids_shown_by_id() {
        let summary = preview(
            ["g1", "ghost"],
            ["a9"],
            Intent::Required,
            &[group("g1", "Alpha")],
            &[],
        );

        assert_eq!(summary.group_names, vec!["Alpha", "ghost"]);
        assert_eq!(summary.app_names, vec!["a9"]);
    }

    #[test]
    fn test_duplicate_ids_counted_once() {
        let summary = preview(["g1", "g1"], ["a1", "a2", "a1"], Intent::Required, &[], &[]);
        assert_eq!(summary.total_pairs, 2);
        assert_eq!(summary.group_names.len(), 1);
    }

    #[test]
    fn test_preview_matches_plan_count() {
        let mut selection = Selection::new();
        selection.select_all_groups(["g1", "g2", "g3"]);
        selection.select_all_apps(["a1", "a2"]);

        let summary = preview_selection(&selection, &[], &[]);
        assert_eq!(summary.total_pairs, selection.plan_count());
    }
}
