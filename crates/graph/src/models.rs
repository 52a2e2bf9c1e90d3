//! Graph wire types and their conversion into the core model.

use assignment::{
    AppType, Application, AssignmentSettings, ExistingAssignment, Group, GroupKind, Intent,
    Notifications, TargetKind,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

pub(crate) const GROUP_TARGET: &str = "#microsoft.graph.groupAssignmentTarget";
pub(crate) const EXCLUSION_TARGET: &str = "#microsoft.graph.exclusionGroupAssignmentTarget";

/// One page of a Graph collection
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphGroup {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub group_types: Vec<String>,
    #[serde(default)]
    pub mail_enabled: bool,
}

impl GraphGroup {
    pub fn into_group(self, member_count: u64) -> Group {
        Group {
            kind: GroupKind::classify(&self.group_types, self.mail_enabled),
            display_name: self.display_name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description.filter(|d| !d.is_empty()),
            member_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphApp {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub id: String,
    pub display_name: Option<String>,
    pub publisher: Option<String>,
    // The version lives under a different name depending on the app kind
    pub version: Option<String>,
    pub version_number: Option<String>,
    pub primary_bundle_version: Option<String>,
    pub size: Option<u64>,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

impl From<GraphApp> for Application {
    fn from(app: GraphApp) -> Self {
        let app_type = app
            .odata_type
            .as_deref()
            .map_or_else(|| AppType::Other("Unknown".to_string()), AppType::from_odata);
        Self {
            display_name: app.display_name.unwrap_or_else(|| app.id.clone()),
            id: app.id,
            publisher: app.publisher.filter(|p| !p.is_empty()),
            version: app
                .version
                .or(app.version_number)
                .or(app.primary_bundle_version),
            app_type,
            size_bytes: app.size.unwrap_or(0),
            created: app.created_date_time,
            last_modified: app.last_modified_date_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphTarget {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphSettings {
    pub notifications: Option<String>,
    pub restart_required: Option<bool>,
}

impl GraphSettings {
    fn into_settings(self) -> Option<AssignmentSettings> {
        let notifications = match self.notifications.as_deref()? {
            "showAll" => Notifications::ShowAll,
            "showReboot" => Notifications::ShowReboot,
            "hideAll" => Notifications::HideAll,
            _ => return None,
        };
        Some(AssignmentSettings {
            notifications,
            restart_required: self.restart_required.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphAssignment {
    pub id: String,
    pub intent: Option<String>,
    pub target: Option<GraphTarget>,
    pub settings: Option<GraphSettings>,
}

impl GraphAssignment {
    pub fn into_existing(self, app_id: &str) -> ExistingAssignment {
        // All-devices and all-users targets carry no group
        let (group_id, target) = self
            .target
            .and_then(|t| {
                let kind = match t.odata_type.as_deref()? {
                    GROUP_TARGET => TargetKind::Include,
                    EXCLUSION_TARGET => TargetKind::Exclude,
                    _ => return None,
                };
                Some((t.group_id, kind))
            })
            .unwrap_or((None, TargetKind::Include));
        ExistingAssignment {
            id: self.id,
            app_id: app_id.to_string(),
            group_id,
            target,
            intent: self.intent.and_then(|i| i.parse().ok()),
            settings: self.settings.and_then(GraphSettings::into_settings),
        }
    }
}

/// Signed-in user, from `GET /me`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Extract `(code, message)` from a Graph error response body
pub(crate) fn parse_error_body(body: &str) -> Option<(Option<String>, String)> {
    let parsed: GraphErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed.error.message.filter(|m| !m.is_empty())?;
    Some((parsed.error.code, message))
}

/// Request body for `POST /mobileApps/{id}/assignments`
pub(crate) fn assignment_body(
    group_id: &str,
    intent: Intent,
    settings: &AssignmentSettings,
) -> Value {
    json!({
        "@odata.type": "#microsoft.graph.mobileAppAssignment",
        "intent": intent.as_str(),
        "target": {
            "@odata.type": GROUP_TARGET,
            "groupId": group_id,
        },
        "settings": {
            "@odata.type": "#microsoft.graph.mobileAppAssignmentSettings",
            "notifications": settings.notifications.as_str(),
            "restartRequired": settings.restart_required,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assignment::AssignmentOptions;

    #[test]
    fn test_parse_app_page() {
        let body = r##"{
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/deviceAppManagement/mobileApps?$skiptoken=abc",
            "value": [
                {
                    "@odata.type": "#microsoft.graph.macOSLobApp",
                    "id": "a1",
                    "displayName": "Slack",
                    "publisher": "Slack Technologies",
                    "versionNumber": "4.38",
                    "primaryBundleVersion": "4.38.125",
                    "size": 1024,
                    "createdDateTime": "2024-03-01T10:00:00Z"
                },
                {
                    "@odata.type": "#microsoft.graph.iosStoreApp",
                    "id": "a2",
                    "displayName": "Outlook"
                }
            ]
        }"##;

        let page: Page<GraphApp> = serde_json::from_str(body).unwrap();
        assert!(page.next_link.is_some());

        let apps: Vec<Application> = page.value.into_iter().map(Into::into).collect();
        assert_eq!(apps[0].app_type, AppType::MacOsLob);
        assert_eq!(apps[0].version.as_deref(), Some("4.38"));
        assert_eq!(apps[0].size_bytes, 1024);
        assert!(apps[0].created.is_some());
        assert_eq!(apps[1].app_type, AppType::Other("iosStoreApp".into()));
        assert!(apps[1].publisher.is_none());
    }

    #[test]
    fn test_parse_group_kinds() {
        let body = r#"{"value": [
            {"id": "g1", "displayName": "Pilot", "groupTypes": ["DynamicMembership"], "mailEnabled": false},
            {"id": "g2", "displayName": "Staff", "groupTypes": ["Unified"], "mailEnabled": true},
            {"id": "g3", "displayName": "Finance", "groupTypes": [], "mailEnabled": false, "description": ""}
        ]}"#;
        let page: Page<GraphGroup> = serde_json::from_str(body).unwrap();
        let groups: Vec<Group> = page.value.into_iter().map(|g| g.into_group(3)).collect();

        assert!(
            groups
                .iter()
                .map(|g| g.kind)
                .eq([GroupKind::Dynamic, GroupKind::MailEnabled, GroupKind::Security])
        );
        assert!(groups[2].description.is_none());
        assert_eq!(groups[0].member_count, 3);
    }

    #[test]
    fn test_assignment_targets() {
        let body = r##"{"value": [
            {"id": "x1", "intent": "required",
             "target": {"@odata.type": "#microsoft.graph.groupAssignmentTarget", "groupId": "g1"},
             "settings": {"notifications": "hideAll", "restartRequired": true}},
            {"id": "x2", "intent": "available",
             "target": {"@odata.type": "#microsoft.graph.allDevicesAssignmentTarget"}},
            {"id": "x3", "intent": "uninstall",
             "target": {"@odata.type": "#microsoft.graph.exclusionGroupAssignmentTarget", "groupId": "g2"}}
        ]}"##;
        let page: Page<GraphAssignment> = serde_json::from_str(body).unwrap();
        let existing: Vec<_> = page.value.into_iter().map(|a| a.into_existing("a1")).collect();

        assert_eq!(existing[0].group_id.as_deref(), Some("g1"));
        assert_eq!(existing[0].target, TargetKind::Include);
        assert_eq!(existing[0].intent, Some(Intent::Required));
        let settings = existing[0].settings.unwrap();
        assert_eq!(settings.notifications, Notifications::HideAll);
        assert!(settings.restart_required);

        assert!(existing[1].group_id.is_none());
        assert_eq!(existing[2].group_id.as_deref(), Some("g2"));
        assert_eq!(existing[2].target, TargetKind::Exclude);
        assert_eq!(existing[2].intent, Some(Intent::Uninstall));
    }

    #[test]
    fn test_assignment_body() {
        let options = AssignmentOptions {
            notify: false,
            restart_required: true,
            override_existing: true,
        };
        let body = assignment_body("g1", Intent::Available, &options.settings());

        assert_eq!(body["intent"], "available");
        assert_eq!(body["target"]["groupId"], "g1");
        assert_eq!(body["settings"]["notifications"], "hideAll");
        assert_eq!(body["settings"]["restartRequired"], true);
        assert!(body["settings"].get("overrideExisting").is_none());
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"code": "Request_ResourceNotFound", "message": "Resource 'g9' does not exist"}}"#;
        let (code, message) = parse_error_body(body).unwrap();
        assert_eq!(code.as_deref(), Some("Request_ResourceNotFound"));
        assert_eq!(message, "Resource 'g9' does not exist");

        assert!(parse_error_body("<html>bad gateway</html>").is_none());
    }
}
