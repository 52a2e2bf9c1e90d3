//! Directory statistics

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::{Application, Group, GroupKind};

/// Summary of the groups in a directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub total: usize,
    pub security: usize,
    pub mail_enabled: usize,
    pub dynamic: usize,
    /// Groups without dynamic membership rules
    pub static_groups: usize,
    /// Rounded to one decimal
    pub average_members: f64,
    pub max_members: u64,
    pub min_members: u64,
    pub total_members: u64,
}

impl GroupStats {
    pub fn from_groups(groups: &[Group]) -> Self {
        if groups.is_empty() {
            return Self::default();
        }

        let count = |kind: GroupKind| groups.iter().filter(|g| g.kind == kind).count();
        let dynamic = count(GroupKind::Dynamic);
        let total_members: u64 = groups.iter().map(|g| g.member_count).sum();

        #[allow(clippy::cast_precision_loss)]
        let average = total_members as f64 / groups.len() as f64;

        Self {
            total: groups.len(),
            security: count(GroupKind::Security),
            mail_enabled: count(GroupKind::MailEnabled),
            dynamic,
            static_groups: groups.len() - dynamic,
            average_members: (average * 10.0).round() / 10.0,
            max_members: groups.iter().map(|g| g.member_count).max().unwrap_or(0),
            min_members: groups.iter().map(|g| g.member_count).min().unwrap_or(0),
            total_members,
        }
    }
}

/// Summary of the applications in a directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppStats {
    pub total: usize,
    /// Count per app type name, sorted by name
    pub by_type: BTreeMap<String, usize>,
    /// Publishers with the most apps, most first, ties by name
    pub top_publishers: Vec<(String, usize)>,
    pub total_size_bytes: u64,
}

impl AppStats {
    const TOP_PUBLISHERS: usize = 5;

    pub fn from_apps(apps: &[Application]) -> Self {
        let mut by_type = BTreeMap::new();
        let mut publishers: HashMap<&str, usize> = HashMap::new();

        for app in apps {
            *by_type.entry(app.app_type.as_str().to_string()).or_insert(0) += 1;
            let publisher = app.publisher.as_deref().unwrap_or("Unknown");
            *publishers.entry(publisher).or_insert(0) += 1;
        }

        let mut top_publishers: Vec<(String, usize)> = publishers
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        top_publishers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_publishers.truncate(Self::TOP_PUBLISHERS);

        Self {
            total: apps.len(),
            by_type,
            top_publishers,
            total_size_bytes: apps.iter().map(|a| a.size_bytes).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::{PlatformFilter, RemoteDirectory};

    #[test]
    fn test_empty_groups() {
        let stats = GroupStats::from_groups(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.average_members.abs() < f64::EPSILON);
    }

    #[test]
    fn test_group_stats_demo() {
        let groups = InMemoryDirectory::demo().list_groups().unwrap();
        let stats = GroupStats::from_groups(&groups);

        assert_eq!(stats.total, 6);
        assert_eq!(stats.dynamic, 2);
        assert_eq!(stats.static_groups, 4);
        assert_eq!(stats.security, 3);
        assert_eq!(stats.mail_enabled, 1);
        assert_eq!(stats.total_members, 247);
        assert_eq!(stats.max_members, 156);
        assert_eq!(stats.min_members, 5);
        // 247 / 6 = 41.1666...
        assert!((stats.average_members - 41.2).abs() < 1e-9);
    }

    #[test]
    fn test_app_stats_demo() {
        let apps = InMemoryDirectory::demo()
            .list_apps(PlatformFilter::MacOs)
            .unwrap();
        let stats = AppStats::from_apps(&apps);

        assert_eq!(stats.total, 10);
        assert_eq!(stats.by_type.get("macOSDmgApp"), Some(&3));
        assert_eq!(stats.top_publishers[0], ("Microsoft".to_string(), 5));
    }
}
