//! Assignment planner - expands a selection into concrete work items

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::directory::RemoteDirectory;
use crate::error::PlanError;
use crate::selection::Selection;
use crate::types::{
    AssignmentOptions, BatchResult, ExistingAssignment, Intent, PlannedAssignment, TargetKind,
};

/// How an existing assignment is matched against a planned pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupKey {
    /// Any existing assignment to the group counts, whatever its intent
    #[default]
    Group,
    /// Only an existing assignment to the group with the same intent counts
    GroupAndIntent,
}

#[derive(Debug, Clone)]
struct IndexedTarget {
    group_id: String,
    intent: Option<Intent>,
    kind: TargetKind,
}

impl IndexedTarget {
    fn matches(&self, group_id: &str, intent: Intent, key: DedupKey) -> bool {
        if self.group_id != group_id {
            return false;
        }
        match key {
            DedupKey::Group => true,
            // An exclusion blocks the group whatever intent is planned
            DedupKey::GroupAndIntent => self.kind.is_exclusion() || self.intent == Some(intent),
        }
    }
}

/// Existing assignments indexed by app, for membership tests
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    by_app: HashMap<String, Vec<IndexedTarget>>,
}

impl ExistingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a flat list of assignments
    pub fn from_assignments<'a, I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = &'a ExistingAssignment>,
    {
        let mut index = Self::new();
        for assignment in assignments {
            index.insert(assignment);
        }
        index
    }

    /// Record an assignment.
    ///
    /// Both included and excluded groups are recorded: a group excluded
    /// from an app counts as already handled, so the planner never adds an
    /// include target on top of an exclusion. Non-group targets (all
    /// devices, all users) are ignored.
    pub fn insert(&mut self, assignment: &ExistingAssignment) {
        let Some(group_id) = &assignment.group_id else {
            return;
        };
        self.by_app
            .entry(assignment.app_id.clone())
            .or_default()
            .push(IndexedTarget {
                group_id: group_id.clone(),
                intent: assignment.intent,
                kind: assignment.target,
            });
    }

    /// Whether `app_id` is already assigned to `group_id` under `key`
    pub fn contains(&self, app_id: &str, group_id: &str, intent: Intent, key: DedupKey) -> bool {
        self.find(app_id, group_id, intent, key).is_some()
    }

    /// First existing target that satisfies `(app_id, group_id, intent)` under `key`
    fn find(
        &self,
        app_id: &str,
        group_id: &str,
        intent: Intent,
        key: DedupKey,
    ) -> Option<&IndexedTarget> {
        self.by_app
            .get(app_id)?
            .iter()
            .find(|target| target.matches(group_id, intent, key))
    }

    pub fn len(&self) -> usize {
        self.by_app.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A pair left out of a plan because the directory already has it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatisfiedPair {
    pub group_id: String,
    pub app_id: String,
    /// Intent of the assignment found in the directory
    pub existing_intent: Option<Intent>,
}

/// Immutable list of assignments to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    assignments: Vec<PlannedAssignment>,
    already_satisfied: Vec<SatisfiedPair>,
}

impl Plan {
    /// Wrap an explicit list of assignments
    pub fn from_assignments(assignments: Vec<PlannedAssignment>) -> Self {
        Self {
            assignments,
            already_satisfied: Vec::new(),
        }
    }

    pub fn assignments(&self) -> &[PlannedAssignment] {
        &self.assignments
    }

    /// Pairs excluded because they already exist (implicit successes)
    pub fn already_satisfied(&self) -> &[SatisfiedPair] {
        &self.already_satisfied
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedAssignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Plan containing only the pairs that failed in `result`.
    ///
    /// Failure indexes refer to positions in this plan.
    pub fn retry_failed(&self, result: &BatchResult) -> Plan {
        let failed: HashSet<usize> = result.failures.iter().map(|f| f.index).collect();
        Plan::from_assignments(
            self.assignments
                .iter()
                .enumerate()
                .filter(|(i, _)| failed.contains(i))
                .map(|(_, a)| a.clone())
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlannedAssignment;
    type IntoIter = std::slice::Iter<'a, PlannedAssignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.assignments.iter()
    }
}

/// Expand groups × apps into a plan.
///
/// Pairs are ordered group-major in the iteration order of the inputs;
/// repeated identifiers are dropped. When `options.override_existing` is
/// false and `existing` is given, pairs already present are moved to
/// [`Plan::already_satisfied`].
pub fn build_plan<G, A, S, T>(
    groups: G,
    apps: A,
    intent: Intent,
    options: AssignmentOptions,
    existing: Option<&ExistingIndex>,
    dedup: DedupKey,
) -> Result<Plan, PlanError>
where
    G: IntoIterator<Item = S>,
    A: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let groups = unique(groups);
    let apps = unique(apps);
    validate(&groups, &apps)?;

    let existing = existing.filter(|_| !options.override_existing);
    let mut plan = Plan::default();

    for group_id in &groups {
        for app_id in &apps {
            let found = existing.and_then(|index| index.find(app_id, group_id, intent, dedup));
            if let Some(found) = found {
                log::info!(
                    "Assignment already exists for app {} to group {}",
                    app_id,
                    group_id
                );
                plan.already_satisfied.push(SatisfiedPair {
                    group_id: group_id.clone(),
                    app_id: app_id.clone(),
                    existing_intent: found.intent,
                });
                continue;
            }

            plan.assignments.push(PlannedAssignment {
                group_id: group_id.clone(),
                app_id: app_id.clone(),
                intent,
                options,
            });
        }
    }

    Ok(plan)
}

fn unique<I, S>(ids: I) -> Vec<String>
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

fn validate(groups: &[String], apps: &[String]) -> Result<(), PlanError> {
    if groups.is_empty() || apps.is_empty() {
        return Err(PlanError::EmptySelection {
            groups: groups.len(),
            apps: apps.len(),
        });
    }
    Ok(())
}

/// Planner bound to a directory for the existing-assignment lookup
pub struct Planner<'a, D: RemoteDirectory + ?Sized> {
    directory: &'a D,
    dedup: DedupKey,
}

impl<'a, D: RemoteDirectory + ?Sized> Planner<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self {
            directory,
            dedup: DedupKey::default(),
        }
    }

    /// Use a different dedup key
    #[must_use]
    pub fn with_dedup(mut self, dedup: DedupKey) -> Self {
        self.dedup = dedup;
        self
    }

    /// Build a plan, listing existing assignments once per app when
    /// `options.override_existing` is false.
    pub fn plan<G, A, S, T>(
        &self,
        groups: G,
        apps: A,
        intent: Intent,
        options: AssignmentOptions,
    ) -> Result<Plan, PlanError>
    where
        G: IntoIterator<Item = S>,
        A: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let groups = unique(groups);
        let apps = unique(apps);
        validate(&groups, &apps)?;

        if options.override_existing {
            return build_plan(&groups, &apps, intent, options, None, self.dedup);
        }

        let existing = self.fetch_existing(&apps)?;
        build_plan(&groups, &apps, intent, options, Some(&existing), self.dedup)
    }

    /// Plan the current contents of a selection
    pub fn plan_selection(&self, selection: &Selection) -> Result<Plan, PlanError> {
        self.plan(
            selection.groups(),
            selection.apps(),
            selection.intent(),
            selection.options(),
        )
    }

    fn fetch_existing(&self, apps: &[String]) -> Result<ExistingIndex, PlanError> {
        let mut index = ExistingIndex::new();
        for app_id in apps {
            log::debug!("Listing existing assignments for app {}", app_id);
            let assignments = self.directory.list_assignments(app_id).map_err(|source| {
                if source.is_authentication() {
                    PlanError::Authentication(source)
                } else {
                    PlanError::DedupFetch {
                        app_id: app_id.clone(),
                        source,
                    }
                }
            })?;
            for assignment in &assignments {
                index.insert(assignment);
            }
        }
        Ok(index)
    }
}
