//! Core types for app-to-group assignment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OptionError;

/// Kind of directory group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    /// Security group with assigned membership
    Security,
    /// Group whose membership is computed from a rule
    Dynamic,
    /// Mail-enabled (Microsoft 365) group
    MailEnabled,
}

impl GroupKind {
    /// Derive the kind from the raw directory attributes.
    ///
    /// Dynamic membership wins over mail-enabled; everything else is
    /// treated as a security group.
    pub fn classify(group_types: &[String], mail_enabled: bool) -> Self {
        if group_types.iter().any(|t| t == "DynamicMembership") {
            Self::Dynamic
        } else if mail_enabled {
            Self::MailEnabled
        } else {
            Self::Security
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Dynamic => "dynamic",
            Self::MailEnabled => "mail-enabled",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "security" => Ok(Self::Security),
            "dynamic" => Ok(Self::Dynamic),
            "mail-enabled" | "mail_enabled" | "mail" | "office365" => Ok(Self::MailEnabled),
            other => Err(format!("unknown group kind '{other}'")),
        }
    }
}

/// A directory group that apps can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: u64,
    pub kind: GroupKind,
}

/// macOS package kinds known to the management service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppType {
    MacOsLob,
    MacOsOfficeSuite,
    MacOsMicrosoftEdge,
    MacOsMicrosoftDefender,
    MacOsWebClip,
    MacOsVpp,
    MacOsPkg,
    MacOsDmg,
    MacOsMdm,
    MacOsCustom,
    /// Any non-macOS type, kept verbatim
    Other(String),
}

impl AppType {
    /// All macOS kinds, in display order
    pub const MACOS: [AppType; 10] = [
        AppType::MacOsLob,
        AppType::MacOsOfficeSuite,
        AppType::MacOsMicrosoftEdge,
        AppType::MacOsMicrosoftDefender,
        AppType::MacOsWebClip,
        AppType::MacOsVpp,
        AppType::MacOsPkg,
        AppType::MacOsDmg,
        AppType::MacOsMdm,
        AppType::MacOsCustom,
    ];

    /// Wire name, e.g. `macOSPkgApp`
    pub fn as_str(&self) -> &str {
        match self {
            Self::MacOsLob => "macOSLobApp",
            Self::MacOsOfficeSuite => "macOSOfficeSuiteApp",
            Self::MacOsMicrosoftEdge => "macOSMicrosoftEdgeApp",
            Self::MacOsMicrosoftDefender => "macOSMicrosoftDefenderApp",
            Self::MacOsWebClip => "macOSWebClip",
            Self::MacOsVpp => "macOSVppApp",
            Self::MacOsPkg => "macOSPkgApp",
            Self::MacOsDmg => "macOSDmgApp",
            Self::MacOsMdm => "macOSMdmApp",
            Self::MacOsCustom => "macOSCustomApp",
            Self::Other(name) => name,
        }
    }

    /// Parse an OData type name, with or without the `#microsoft.graph.` prefix
    pub fn from_odata(odata_type: &str) -> Self {
        let name = odata_type
            .strip_prefix("#microsoft.graph.")
            .unwrap_or(odata_type);
        Self::MACOS
            .iter()
            .find(|t| t.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    pub fn is_macos(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Terminal icon for the app kind
    pub fn icon(&self) -> &'static str {
        match self {
            Self::MacOsLob | Self::MacOsPkg => "📦",
            Self::MacOsOfficeSuite => "📄",
            Self::MacOsMicrosoftEdge => "🌐",
            Self::MacOsMicrosoftDefender => "🛡️",
            Self::MacOsWebClip => "🔗",
            Self::MacOsVpp => "🛍️",
            Self::MacOsDmg => "💿",
            Self::MacOsMdm => "⚙️",
            Self::MacOsCustom => "🔧",
            Self::Other(_) => "📱",
        }
    }
}

impl From<String> for AppType {
    fn from(s: String) -> Self {
        Self::from_odata(&s)
    }
}

impl From<AppType> for String {
    fn from(t: AppType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployable application known to the management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub app_type: AppType,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Effect an assignment has on targeted devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Install automatically
    #[default]
    Required,
    /// Offer in the company portal
    Available,
    /// Remove from devices
    Uninstall,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Intent::Required, Intent::Available, Intent::Uninstall];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Available => "available",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "available" => Ok(Self::Available),
            "uninstall" => Ok(Self::Uninstall),
            other => Err(OptionError::InvalidIntent(other.to_string())),
        }
    }
}

/// Options applied uniformly to every pair of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOptions {
    /// Show end-user notifications
    pub notify: bool,
    /// Require a restart after installation
    pub restart_required: bool,
    /// Skip the existing-assignment check and let the service decide
    pub override_existing: bool,
}

impl Default for AssignmentOptions {
    fn default() -> Self {
        Self {
            notify: true,
            restart_required: false,
            override_existing: true,
        }
    }
}

impl AssignmentOptions {
    /// Set a single option by name.
    ///
    /// Unknown keys are rejected rather than ignored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), OptionError> {
        let field = match key {
            "notify" => &mut self.notify,
            "restart_required" | "restartRequired" | "restart-required" => {
                &mut self.restart_required
            }
            "override_existing" | "overrideExisting" | "override-existing" => {
                &mut self.override_existing
            }
            other => return Err(OptionError::UnknownKey(other.to_string())),
        };
        *field = parse_bool(key, value)?;
        Ok(())
    }

    /// Build options from `key=value` pairs on top of the defaults
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut options = Self::default();
        options.apply_pairs(pairs)?;
        Ok(options)
    }

    /// Apply `key=value` pairs to these options
    pub fn apply_pairs<'a, I>(&mut self, pairs: I) -> Result<(), OptionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| OptionError::Malformed(pair.to_string()))?;
            self.set(key.trim(), value.trim())?;
        }
        Ok(())
    }

    /// Settings sent with each created assignment
    pub fn settings(&self) -> AssignmentSettings {
        AssignmentSettings {
            notifications: if self.notify {
                Notifications::ShowAll
            } else {
                Notifications::HideAll
            },
            restart_required: self.restart_required,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, OptionError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(OptionError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// End-user notification level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Notifications {
    ShowAll,
    ShowReboot,
    HideAll,
}

impl Notifications {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowAll => "showAll",
            Self::ShowReboot => "showReboot",
            Self::HideAll => "hideAll",
        }
    }
}

/// Typed assignment settings derived from [`AssignmentOptions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    pub notifications: Notifications,
    pub restart_required: bool,
}

/// One unit of work: assign `app_id` to `group_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAssignment {
    pub group_id: String,
    pub app_id: String,
    pub intent: Intent,
    pub options: AssignmentOptions,
}

impl PlannedAssignment {
    /// Short label for logs and progress output
    pub fn label(&self) -> String {
        format!("{} → {}", self.app_id, self.group_id)
    }
}

/// Whether an assignment targets a group or excludes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    Include,
    Exclude,
}

impl TargetKind {
    pub fn is_exclusion(&self) -> bool {
        matches!(self, Self::Exclude)
    }
}

/// An assignment already present in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingAssignment {
    pub id: String,
    pub app_id: String,
    /// Target group; `None` for non-group targets (all devices, all users)
    pub group_id: Option<String>,
    /// Include or exclude; only meaningful when `group_id` is set
    #[serde(default)]
    pub target: TargetKind,
    pub intent: Option<Intent>,
    pub settings: Option<AssignmentSettings>,
}

/// Category of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Credentials invalid, expired or lacking permission
    Authentication,
    /// Rate limited by the service
    Throttled,
    /// App, group or assignment does not exist
    NotFound,
    /// The service rejected a duplicate or conflicting change
    Conflict,
    /// Transport failure or server error
    Network,
    /// Anything else
    Other,
}

impl RemoteErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Network)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed",
            Self::Throttled => "Request throttled",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::Network => "Network connectivity issue",
            Self::Other => "Unexpected error",
        }
    }
}

/// A single failed pair in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFailure {
    /// Position of the pair in the executed plan
    pub index: usize,
    pub group_id: String,
    pub app_id: String,
    /// Original error message, verbatim
    pub message: String,
    pub kind: RemoteErrorKind,
}

/// Aggregate outcome of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    /// Failures ordered by plan index
    pub failures: Vec<AssignmentFailure>,
}

impl BatchResult {
    /// Empty result for a plan of `total` pairs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure == 0
    }

    /// Number of pairs that were attempted
    pub fn attempted(&self) -> usize {
        self.success + self.failure
    }

    /// Whether every pair of the plan was attempted
    pub fn is_complete(&self) -> bool {
        self.attempted() == self.total
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, failure: AssignmentFailure) {
        self.failure += 1;
        self.failures.push(failure);
    }

    /// Order failures by their plan index
    pub fn sort_failures(&mut self) {
        self.failures.sort_by_key(|f| f.index);
    }
}

/// Read-only projection of a selection, shown before applying
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub total_pairs: usize,
    pub intent: Intent,
    pub group_names: Vec<String>,
    pub app_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_kind_classify() {
        let dynamic = vec!["DynamicMembership".to_string(), "Unified".to_string()];
        assert_eq!(GroupKind::classify(&dynamic, true), GroupKind::Dynamic);
        assert_eq!(GroupKind::classify(&["Unified".into()], true), GroupKind::MailEnabled);
        assert_eq!(GroupKind::classify(&[], false), GroupKind::Security);
    }

    #[test]
    fn test_app_type_from_odata() {
        assert_eq!(
            AppType::from_odata("#microsoft.graph.macOSPkgApp"),
            AppType::MacOsPkg
        );
        assert_eq!(AppType::from_odata("macOSDmgApp"), AppType::MacOsDmg);

        let ios = AppType::from_odata("#microsoft.graph.iosVppApp");
        assert_eq!(ios, AppType::Other("iosVppApp".to_string()));
        assert!(!ios.is_macos());
    }

    #[test]
    fn test_app_type_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            AppType::MACOS.iter().map(AppType::as_str).collect();
        assert_eq!(names.len(), AppType::MACOS.len());
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!("Required".parse::<Intent>().unwrap(), Intent::Required);
        assert_eq!(" available ".parse::<Intent>().unwrap(), Intent::Available);
        assert!(matches!(
            "install".parse::<Intent>(),
            Err(OptionError::InvalidIntent(_))
        ));
    }

    #[test]
    fn test_options_from_pairs() {
        let options =
            AssignmentOptions::from_pairs(["notify=false", "restartRequired=yes"]).unwrap();
        assert!(!options.notify);
        assert!(options.restart_required);
        assert!(options.override_existing);
    }

    #[test]
    fn test_options_reject_unknown_key() {
        let err = AssignmentOptions::from_pairs(["deadline=tomorrow"]).unwrap_err();
        assert!(matches!(err, OptionError::UnknownKey(k) if k == "deadline"));
    }

    #[test]
    fn test_options_unknown_key_wins_over_bad_value() {
        let mut options = AssignmentOptions::default();
        let err = options.set("deadline", "tomorrow").unwrap_err();
        assert!(matches!(err, OptionError::UnknownKey(k) if k == "deadline"));
        assert_eq!(options, AssignmentOptions::default());

        let err = options.set("notify", "tomorrow").unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { .. }));
    }

    #[test]
    fn test_options_reject_bad_value_and_malformed_pair() {
        assert!(matches!(
            AssignmentOptions::from_pairs(["notify=maybe"]),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(matches!(
            AssignmentOptions::from_pairs(["notify"]),
            Err(OptionError::Malformed(_))
        ));
    }

    #[test]
    fn test_settings_from_options() {
        let quiet = AssignmentOptions {
            notify: false,
            restart_required: true,
            override_existing: false,
        };
        let settings = quiet.settings();
        assert_eq!(settings.notifications, Notifications::HideAll);
        assert!(settings.restart_required);
        assert_eq!(
            AssignmentOptions::default().settings().notifications,
            Notifications::ShowAll
        );
    }

    #[test]
    fn test_batch_result_accounting() {
        let mut result = BatchResult::new(3);
        result.record_success();
        result.record_failure(AssignmentFailure {
            index: 2,
            group_id: "g".into(),
            app_id: "b".into(),
            message: "boom".into(),
            kind: RemoteErrorKind::Other,
        });
        result.record_failure(AssignmentFailure {
            index: 1,
            group_id: "g".into(),
            app_id: "a".into(),
            message: "boom".into(),
            kind: RemoteErrorKind::Other,
        });
        result.sort_failures();

        assert!(result.is_complete());
        assert!(!result.is_success());
        assert_eq!(result.failures[0].index, 1);
    }
}
