//! In-memory directory for tests and offline demos.
//!
//! Behaves like a remote directory whose `create_assignment` is an upsert:
//! assigning an app to a group twice updates the existing assignment.
//! Failures can be injected per pair, per app listing, or globally.
//!
//! ```
//! use assignment::{InMemoryDirectory, RemoteDirectory, RemoteError, Intent, AssignmentOptions};
//!
//! let directory = InMemoryDirectory::new();
//! directory.fail_pair("G2", "A1", RemoteError::other("quota exceeded"));
//!
//! let settings = AssignmentOptions::default().settings();
//! assert!(directory.create_assignment("A1", "G1", Intent::Required, &settings).is_ok());
//! assert!(directory.create_assignment("A1", "G2", Intent::Required, &settings).is_err());
//! assert_eq!(directory.create_calls(), 2);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::directory::{PlatformFilter, RemoteDirectory};
use crate::error::RemoteError;
use crate::types::{
    AppType, Application, AssignmentSettings, ExistingAssignment, Group, GroupKind, Intent,
    TargetKind,
};

#[derive(Debug, Default)]
struct State {
    groups: Vec<Group>,
    apps: Vec<Application>,
    assignments: Vec<ExistingAssignment>,
    pair_failures: HashMap<(String, String), RemoteError>,
    listing_failures: HashMap<String, RemoteError>,
    fail_all: Option<RemoteError>,
    next_id: u64,
}

/// Directory held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    create_calls: AtomicUsize,
    list_assignment_calls: AtomicUsize,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory with the given groups and apps
    pub fn with_data(groups: Vec<Group>, apps: Vec<Application>) -> Self {
        let directory = Self::new();
        {
            let mut state = directory.state();
            state.groups = groups;
            state.apps = apps;
        }
        directory
    }

    pub fn add_group(&self, group: Group) {
        self.state().groups.push(group);
    }

    pub fn add_app(&self, app: Application) {
        self.state().apps.push(app);
    }

    /// Seed an existing group assignment
    pub fn add_assignment(&self, app_id: &str, group_id: &str, intent: Intent) -> String {
        let mut state = self.state();
        let id = next_assignment_id(&mut state);
        state.assignments.push(ExistingAssignment {
            id: id.clone(),
            app_id: app_id.to_string(),
            group_id: Some(group_id.to_string()),
            target: TargetKind::Include,
            intent: Some(intent),
            settings: None,
        });
        id
    }

    /// Seed an exclusion of `group_id` from an app's assignments
    pub fn add_exclusion(&self, app_id: &str, group_id: &str) -> String {
        let mut state = self.state();
        let id = next_assignment_id(&mut state);
        state.assignments.push(ExistingAssignment {
            id: id.clone(),
            app_id: app_id.to_string(),
            group_id: Some(group_id.to_string()),
            target: TargetKind::Exclude,
            intent: Some(Intent::Required),
            settings: None,
        });
        id
    }

    /// Make `create_assignment` fail for one (group, app) pair
    pub fn fail_pair(&self, group_id: &str, app_id: &str, error: RemoteError) {
        self.state()
            .pair_failures
            .insert((group_id.to_string(), app_id.to_string()), error);
    }

    /// Make `list_assignments` fail for one app
    pub fn fail_listing(&self, app_id: &str, error: RemoteError) {
        self.state()
            .listing_failures
            .insert(app_id.to_string(), error);
    }

    /// Make every call fail with `error`
    pub fn fail_all(&self, error: RemoteError) {
        self.state().fail_all = Some(error);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.pair_failures.clear();
        state.listing_failures.clear();
        state.fail_all = None;
    }

    /// Number of `create_assignment` calls made so far
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_assignments` calls made so far
    pub fn list_assignment_calls(&self) -> usize {
        self.list_assignment_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored assignment
    pub fn assignments(&self) -> Vec<ExistingAssignment> {
        self.state().assignments.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_global(&self) -> Result<(), RemoteError> {
        match &self.state().fail_all {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Deterministic sample tenant used by `--demo`
    pub fn demo() -> Self {
        let groups = vec![
            demo_group("grp-eng-macs", "Engineering Macs", 48, GroupKind::Dynamic),
            demo_group("grp-design", "Design Team", 12, GroupKind::Security),
            demo_group("grp-all-staff", "All Staff", 156, GroupKind::MailEnabled),
            demo_group("grp-finance", "Finance", 9, GroupKind::Security),
            demo_group("grp-pilot", "macOS Pilot Ring", 5, GroupKind::Dynamic),
            demo_group("grp-contractors", "Contractors", 17, GroupKind::Security),
        ];

        let apps = vec![
            demo_app("app-teams", "Microsoft Teams", "Microsoft", "24033.811", AppType::MacOsPkg, 312),
            demo_app("app-slack", "Slack", "Slack Technologies", "4.38.125", AppType::MacOsDmg, 158),
            demo_app("app-chrome", "Google Chrome", "Google LLC", "124.0.6367", AppType::MacOsDmg, 226),
            demo_app("app-zoom", "Zoom Workplace", "Zoom Video Communications", "6.0.11", AppType::MacOsPkg, 94),
            demo_app("app-vscode", "Visual Studio Code", "Microsoft", "1.89.1", AppType::MacOsDmg, 201),
            demo_app("app-edge", "Microsoft Edge", "Microsoft", "124.0.2478", AppType::MacOsMicrosoftEdge, 0),
            demo_app("app-defender", "Microsoft Defender", "Microsoft", "101.24032", AppType::MacOsMicrosoftDefender, 0),
            demo_app("app-office", "Microsoft 365 Apps", "Microsoft", "16.84", AppType::MacOsOfficeSuite, 0),
            demo_app("app-keynote", "Keynote", "Apple", "14.0", AppType::MacOsVpp, 0),
            demo_app("app-portal-clip", "IT Help Portal", "Contoso IT", "1.0", AppType::MacOsWebClip, 0),
            demo_app("app-ios-outlook", "Outlook for iOS", "Microsoft", "4.2417", AppType::Other("iosStoreApp".into()), 0),
        ];

        let directory = Self::with_data(groups, apps);
        directory.add_assignment("app-teams", "grp-all-staff", Intent::Required);
        directory.add_assignment("app-slack", "grp-eng-macs", Intent::Available);
        directory.add_assignment("app-defender", "grp-pilot", Intent::Required);
        directory
    }
}

fn next_assignment_id(state: &mut State) -> String {
    state.next_id += 1;
    format!("assignment-{}", state.next_id)
}

fn demo_group(id: &str, name: &str, members: u64, kind: GroupKind) -> Group {
    Group {
        id: id.to_string(),
        display_name: name.to_string(),
        description: None,
        member_count: members,
        kind,
    }
}

fn demo_app(
    id: &str,
    name: &str,
    publisher: &str,
    version: &str,
    app_type: AppType,
    size_mb: u64,
) -> Application {
    Application {
        id: id.to_string(),
        display_name: name.to_string(),
        publisher: Some(publisher.to_string()),
        version: Some(version.to_string()),
        app_type,
        size_bytes: size_mb * 1024 * 1024,
        created: None,
        last_modified: None,
    }
}

impl RemoteDirectory for InMemoryDirectory {
    fn list_groups(&self) -> Result<Vec<Group>, RemoteError> {
        self.check_global()?;
        Ok(self.state().groups.clone())
    }

    fn list_apps(&self, platform: PlatformFilter) -> Result<Vec<Application>, RemoteError> {
        self.check_global()?;
        Ok(self
            .state()
            .apps
            .iter()
            .filter(|a| platform.matches(&a.app_type))
            .cloned()
            .collect())
    }

    fn list_assignments(&self, app_id: &str) -> Result<Vec<ExistingAssignment>, RemoteError> {
        self.list_assignment_calls.fetch_add(1, Ordering::SeqCst);
        self.check_global()?;

        let state = self.state();
        if let Some(err) = state.listing_failures.get(app_id) {
            return Err(err.clone());
        }
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.app_id == app_id)
            .cloned()
            .collect())
    }

    fn create_assignment(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        settings: &AssignmentSettings,
    ) -> Result<(), RemoteError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_global()?;

        let mut state = self.state();
        if let Some(err) = state
            .pair_failures
            .get(&(group_id.to_string(), app_id.to_string()))
        {
            return Err(err.clone());
        }

        let existing = state
            .assignments
            .iter_mut()
            .find(|a| {
                a.app_id == app_id
                    && a.group_id.as_deref() == Some(group_id)
                    && a.target == TargetKind::Include
            });
        match existing {
            Some(assignment) => {
                assignment.intent = Some(intent);
                assignment.settings = Some(*settings);
            }
            None => {
                let id = next_assignment_id(&mut state);
                state.assignments.push(ExistingAssignment {
                    id,
                    app_id: app_id.to_string(),
                    group_id: Some(group_id.to_string()),
                    target: TargetKind::Include,
                    intent: Some(intent),
                    settings: Some(*settings),
                });
            }
        }
        Ok(())
    }

    fn delete_assignment(&self, app_id: &str, assignment_id: &str) -> Result<(), RemoteError> {
        self.check_global()?;

        let mut state = self.state();
        let before = state.assignments.len();
        state
            .assignments
            .retain(|a| !(a.app_id == app_id && a.id == assignment_id));
        if state.assignments.len() == before {
            return Err(RemoteError::not_found(format!(
                "assignment {assignment_id} not found for app {app_id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssignmentOptions;

    #[test]
    fn test_create_is_upsert() {
        let directory = InMemoryDirectory::new();
        let settings = AssignmentOptions::default().settings();

        directory
            .create_assignment("A1", "G1", Intent::Required, &settings)
            .unwrap();
        directory
            .create_assignment("A1", "G1", Intent::Uninstall, &settings)
            .unwrap();

        let stored = directory.assignments();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].intent, Some(Intent::Uninstall));
    }

    #[test]
    fn test_delete_missing_assignment() {
        let directory = InMemoryDirectory::new();
        let err = directory.delete_assignment("A1", "nope").unwrap_err();
        assert_eq!(err.kind, crate::types::RemoteErrorKind::NotFound);
    }

    #[test]
    fn test_clear_assignments() {
        let directory = InMemoryDirectory::new();
        directory.add_assignment("A1", "G1", Intent::Required);
        directory.add_assignment("A1", "G2", Intent::Available);
        directory.add_assignment("A2", "G1", Intent::Required);

        assert_eq!(directory.clear_assignments("A1").unwrap(), 2);
        assert!(directory.list_assignments("A1").unwrap().is_empty());
        assert_eq!(directory.list_assignments("A2").unwrap().len(), 1);
    }

    #[test]
    fn test_demo_platform_filter() {
        let directory = InMemoryDirectory::demo();
        let macos = directory.list_apps(PlatformFilter::MacOs).unwrap();
        let all = directory.list_apps(PlatformFilter::All).unwrap();

        assert_eq!(all.len(), macos.len() + 1);
        assert!(macos.iter().all(|a| a.app_type.is_macos()));
        assert_eq!(directory.list_groups().unwrap().len(), 6);
    }

    #[test]
    fn test_fail_all_and_clear() {
        let directory = InMemoryDirectory::demo();
        directory.fail_all(RemoteError::authentication("expired"));
        assert!(directory.list_groups().is_err());

        directory.clear_failures();
        assert!(directory.list_groups().is_ok());
    }
}
