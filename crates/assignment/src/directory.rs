//! Remote directory trait
//!
//! The directory is the only collaborator that talks to the management
//! service. Pagination, throttling and authentication live behind it.

use crate::error::RemoteError;
use crate::types::{
    AppType, Application, AssignmentSettings, ExistingAssignment, Group, GroupKind, Intent,
};

/// Which platforms `list_apps` should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformFilter {
    /// Only the macOS package kinds
    #[default]
    MacOs,
    /// Every app in the tenant
    All,
}

impl PlatformFilter {
    pub fn matches(&self, app_type: &AppType) -> bool {
        match self {
            Self::MacOs => app_type.is_macos(),
            Self::All => true,
        }
    }
}

/// Source of groups, apps and assignments
///
/// Implementations must be safe to call from several worker threads at
/// once; the executor issues `create_assignment` calls concurrently when
/// configured with more than one job.
pub trait RemoteDirectory: Send + Sync {
    /// All groups in the tenant
    fn list_groups(&self) -> Result<Vec<Group>, RemoteError>;

    /// Apps, restricted by platform
    fn list_apps(&self, platform: PlatformFilter) -> Result<Vec<Application>, RemoteError>;

    /// Assignments currently configured for one app
    fn list_assignments(&self, app_id: &str) -> Result<Vec<ExistingAssignment>, RemoteError>;

    /// Create a group assignment for an app
    fn create_assignment(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        settings: &AssignmentSettings,
    ) -> Result<(), RemoteError>;

    /// Delete one assignment of an app
    fn delete_assignment(&self, app_id: &str, assignment_id: &str) -> Result<(), RemoteError>;

    /// Remove every assignment of an app, returning how many were deleted
    ///
    /// Stops at the first failed deletion.
    fn clear_assignments(&self, app_id: &str) -> Result<usize, RemoteError> {
        let existing = self.list_assignments(app_id)?;
        let mut removed = 0;
        for assignment in &existing {
            self.delete_assignment(app_id, &assignment.id)?;
            removed += 1;
        }
        log::info!("Removed {} assignments from app {}", removed, app_id);
        Ok(removed)
    }
}

impl<D: RemoteDirectory + ?Sized> RemoteDirectory for &D {
    fn list_groups(&self) -> Result<Vec<Group>, RemoteError> {
        (**self).list_groups()
    }

    fn list_apps(&self, platform: PlatformFilter) -> Result<Vec<Application>, RemoteError> {
        (**self).list_apps(platform)
    }

    fn list_assignments(&self, app_id: &str) -> Result<Vec<ExistingAssignment>, RemoteError> {
        (**self).list_assignments(app_id)
    }

    fn create_assignment(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        settings: &AssignmentSettings,
    ) -> Result<(), RemoteError> {
        (**self).create_assignment(app_id, group_id, intent, settings)
    }

    fn delete_assignment(&self, app_id: &str, assignment_id: &str) -> Result<(), RemoteError> {
        (**self).delete_assignment(app_id, assignment_id)
    }
}

impl<D: RemoteDirectory + ?Sized> RemoteDirectory for Box<D> {
    fn list_groups(&self) -> Result<Vec<Group>, RemoteError> {
        (**self).list_groups()
    }

    fn list_apps(&self, platform: PlatformFilter) -> Result<Vec<Application>, RemoteError> {
        (**self).list_apps(platform)
    }

    fn list_assignments(&self, app_id: &str) -> Result<Vec<ExistingAssignment>, RemoteError> {
        (**self).list_assignments(app_id)
    }

    fn create_assignment(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        settings: &AssignmentSettings,
    ) -> Result<(), RemoteError> {
        (**self).create_assignment(app_id, group_id, intent, settings)
    }

    fn delete_assignment(&self, app_id: &str, assignment_id: &str) -> Result<(), RemoteError> {
        (**self).delete_assignment(app_id, assignment_id)
    }
}

/// Case-insensitive substring filter over apps
#[derive(Debug, Clone, Default)]
pub struct AppFilter {
    pub name: Option<String>,
    pub publisher: Option<String>,
    /// Matches anywhere in the app type name, e.g. `Pkg` or `macOSDmgApp`
    pub app_type: Option<String>,
}

impl AppFilter {
    pub fn matches(&self, app: &Application) -> bool {
        if let Some(name) = &self.name
            && !contains_ignore_case(&app.display_name, name)
        {
            return false;
        }

        if let Some(publisher) = &self.publisher
            && !contains_ignore_case(app.publisher.as_deref().unwrap_or(""), publisher)
        {
            return false;
        }

        if let Some(app_type) = &self.app_type
            && !contains_ignore_case(app.app_type.as_str(), app_type)
        {
            return false;
        }

        true
    }

    pub fn apply(&self, apps: Vec<Application>) -> Vec<Application> {
        apps.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Filter over groups by kind and name
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub name: Option<String>,
    pub kind: Option<GroupKind>,
}

impl GroupFilter {
    pub fn matches(&self, group: &Group) -> bool {
        if let Some(kind) = self.kind
            && group.kind != kind
        {
            return false;
        }

        if let Some(name) = &self.name
            && !contains_ignore_case(&group.display_name, name)
        {
            return false;
        }

        true
    }

    pub fn apply(&self, groups: Vec<Group>) -> Vec<Group> {
        groups.into_iter().filter(|g| self.matches(g)).collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, publisher: Option<&str>, app_type: AppType) -> Application {
        Application {
            id: name.to_lowercase(),
            display_name: name.to_string(),
            publisher: publisher.map(str::to_string),
            version: None,
            app_type,
            size_bytes: 0,
            created: None,
            last_modified: None,
        }
    }

    fn group(name: &str, kind: GroupKind) -> Group {
        Group {
            id: name.to_lowercase(),
            display_name: name.to_string(),
            description: None,
            member_count: 0,
            kind,
        }
    }

    #[test]
    fn test_platform_filter() {
        assert!(PlatformFilter::MacOs.matches(&AppType::MacOsVpp));
        assert!(!PlatformFilter::MacOs.matches(&AppType::Other("iosVppApp".into())));
        assert!(PlatformFilter::All.matches(&AppType::Other("win32LobApp".into())));
    }

    #[test]
    fn test_app_filter_by_name_and_publisher() {
        let apps = vec![
            app("Slack", Some("Slack Technologies"), AppType::MacOsPkg),
            app("Zoom", Some("Zoom Video"), AppType::MacOsDmg),
            app("Company Portal", None, AppType::MacOsLob),
        ];

        let filter = AppFilter {
            name: Some("SLA".into()),
            ..Default::default()
        };
        assert_eq!(filter.apply(apps.clone()).len(), 1);

        let filter = AppFilter {
            publisher: Some("video".into()),
            ..Default::default()
        };
        let matched = filter.apply(apps.clone());
        assert_eq!(matched[0].display_name, "Zoom");

        // Missing publisher never matches a publisher filter
        let filter = AppFilter {
            publisher: Some("portal".into()),
            ..Default::default()
        };
        assert!(filter.apply(apps).is_empty());
    }

    #[test]
    fn test_app_filter_by_type() {
        let apps = vec![
            app("Slack", None, AppType::MacOsPkg),
            app("Zoom", None, AppType::MacOsDmg),
        ];
        let filter = AppFilter {
            app_type: Some("dmg".into()),
            ..Default::default()
        };
        assert_eq!(filter.apply(apps)[0].display_name, "Zoom");
    }

    #[test]
    fn test_group_filter() {
        let groups = vec![
            group("Engineering Macs", GroupKind::Dynamic),
            group("Design", GroupKind::Security),
            group("All Staff", GroupKind::MailEnabled),
        ];

        let dynamic = GroupFilter {
            kind: Some(GroupKind::Dynamic),
            ..Default::default()
        };
        assert_eq!(dynamic.apply(groups.clone()).len(), 1);

        let by_name = GroupFilter {
            name: Some("s".into()),
            kind: Some(GroupKind::Security),
        };
        assert_eq!(by_name.apply(groups)[0].display_name, "Design");
    }
}
