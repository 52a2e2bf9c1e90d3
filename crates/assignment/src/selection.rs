//! Selection model - the groups and apps a user has picked

use std::collections::BTreeSet;

use crate::types::{AssignmentOptions, Intent};

/// Interactive selection of groups and apps plus assignment options
///
/// Identifiers are opaque and not checked against the directory. Sets are
/// kept sorted so plans built from a selection are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    groups: BTreeSet<String>,
    apps: BTreeSet<String>,
    intent: Intent,
    options: AssignmentOptions,
}

impl Selection {
    /// Create an empty selection with default intent and options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty selection with the given intent and options
    pub fn with_settings(intent: Intent, options: AssignmentOptions) -> Self {
        Self {
            intent,
            options,
            ..Default::default()
        }
    }

    /// Add the group if absent, remove it if present.
    ///
    /// Returns `true` if the group is selected afterwards.
    pub fn toggle_group(&mut self, id: &str) -> bool {
        toggle(&mut self.groups, id)
    }

    /// Add the app if absent, remove it if present.
    ///
    /// Returns `true` if the app is selected afterwards.
    pub fn toggle_app(&mut self, id: &str) -> bool {
        toggle(&mut self.apps, id)
    }

    /// Select every visible group, keeping existing selections
    pub fn select_all_groups<I, S>(&mut self, visible: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(visible.into_iter().map(Into::into));
    }

    /// Select every visible app, keeping existing selections
    pub fn select_all_apps<I, S>(&mut self, visible: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apps.extend(visible.into_iter().map(Into::into));
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    pub fn clear_apps(&mut self) {
        self.apps.clear();
    }

    /// Clear both sets; intent and options are kept
    pub fn clear(&mut self) {
        self.groups.clear();
        self.apps.clear();
    }

    /// Number of assignments the next plan will contain (before dedup)
    pub fn plan_count(&self) -> usize {
        self.groups.len() * self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() || self.apps.is_empty()
    }

    pub fn is_group_selected(&self, id: &str) -> bool {
        self.groups.contains(id)
    }

    pub fn is_app_selected(&self, id: &str) -> bool {
        self.apps.contains(id)
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn apps(&self) -> &BTreeSet<String> {
        &self.apps
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = intent;
    }

    pub fn options(&self) -> AssignmentOptions {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut AssignmentOptions {
        &mut self.options
    }

    pub fn set_options(&mut self, options: AssignmentOptions) {
        self.options = options;
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut selection = Selection::new();
        selection.toggle_group("G2");
        let before = selection.clone();

        assert!(selection.toggle_group("G1"));
        assert!(!selection.toggle_group("G1"));

        assert_eq!(selection, before);
    }

    #[test]
    fn test_toggle_back_to_empty() {
        let mut selection = Selection::new();
        selection.toggle_app("A1");
        selection.toggle_group("G1");
        selection.toggle_group("G1");

        assert!(selection.groups().is_empty());
        assert_eq!(selection.plan_count(), 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_plan_count_is_product() {
        let mut selection = Selection::new();
        selection.select_all_groups(["G1", "G2", "G3"]);
        selection.select_all_apps(["A1", "A2"]);
        assert_eq!(selection.plan_count(), 6);

        selection.toggle_app("A2");
        assert_eq!(selection.plan_count(), 3);
    }

    #[test]
    fn test_select_all_keeps_existing() {
        let mut selection = Selection::new();
        selection.toggle_group("hidden");
        selection.select_all_groups(vec!["a".to_string(), "b".to_string()]);

        assert_eq!(selection.groups().len(), 3);
        assert!(selection.is_group_selected("hidden"));
    }

    #[test]
    fn test_clear_keeps_settings() {
        let mut selection = Selection::with_settings(
            Intent::Uninstall,
            AssignmentOptions {
                notify: false,
                ..Default::default()
            },
        );
        selection.select_all_groups(["G1"]);
        selection.select_all_apps(["A1"]);
        selection.clear();

        assert_eq!(selection.plan_count(), 0);
        assert_eq!(selection.intent(), Intent::Uninstall);
        assert!(!selection.options().notify);
    }

    #[test]
    fn test_groups_iterate_sorted() {
        let mut selection = Selection::new();
        selection.toggle_group("zeta");
        selection.toggle_group("alpha");
        let ids: Vec<_> = selection.groups().iter().cloned().collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
