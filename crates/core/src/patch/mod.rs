#![forbid(unsafe_code)]

//! Merge-patch resolution: turns a sparse patch into the next entity state
//! plus the list of fields whose value actually changed.

use crate::ValidationError;
use crate::model::{
    PullRequest, PullRequestStatus, Sprint, SprintStatus, Task, TaskPriority, TaskStatus,
    format_date,
};
use serde::{Deserialize, Deserializer};
use time::Date;

#[cfg(test)]
mod tests;

/// One patchable field: left alone, cleared, or set.
///
/// Deserializing a struct field with `#[serde(default)]` maps a missing key to
/// `Absent`, an explicit `null` to `Null` and anything else to `Value`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Field-level diff of one edit, in the order the fields were resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldChanges(Vec<FieldChange>);

impl FieldChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change; equal old and new values are dropped.
    pub fn push(&mut self, field: impl Into<String>, old: Option<String>, new: Option<String>) {
        if old == new {
            return;
        }
        self.0.push(FieldChange {
            field: field.into(),
            old,
            new,
        });
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.iter().find(|change| change.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldChanges {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patched<T> {
    pub entity: T,
    pub changes: FieldChanges,
}

pub trait Patchable: Sized {
    type Patch;

    /// Resolves `patch` against `self` without mutating it.
    fn apply_patch(&self, patch: &Self::Patch) -> Result<Patched<Self>, ValidationError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskPatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
    pub status: Patch<TaskStatus>,
    pub priority: Patch<TaskPriority>,
    pub assignee: Patch<String>,
    pub due_date: Patch<Date>,
    pub sprint: Patch<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SprintPatch {
    pub name: Patch<String>,
    pub goal: Patch<String>,
    pub status: Patch<SprintStatus>,
    pub start_date: Patch<Date>,
    pub end_date: Patch<Date>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PullRequestPatch {
    pub title: Patch<String>,
    pub url: Patch<String>,
    pub status: Patch<PullRequestStatus>,
}

fn required<T: Clone + PartialEq>(
    field: &'static str,
    current: &T,
    patch: &Patch<T>,
    render: impl Fn(&T) -> String,
    changes: &mut FieldChanges,
) -> Result<T, ValidationError> {
    match patch {
        Patch::Absent => Ok(current.clone()),
        Patch::Null => Err(ValidationError::not_nullable(field)),
        Patch::Value(value) => {
            if value != current {
                changes.push(field, Some(render(current)), Some(render(value)));
            }
            Ok(value.clone())
        }
    }
}

fn optional<T: Clone + PartialEq>(
    field: &'static str,
    current: &Option<T>,
    patch: &Patch<T>,
    render: impl Fn(&T) -> String,
    changes: &mut FieldChanges,
) -> Option<T> {
    let next = match patch {
        Patch::Absent => return current.clone(),
        Patch::Null => None,
        Patch::Value(value) => Some(value.clone()),
    };
    if &next != current {
        changes.push(
            field,
            current.as_ref().map(&render),
            next.as_ref().map(&render),
        );
    }
    next
}

fn date(value: &Date) -> String {
    format_date(*value)
}

impl Patchable for Task {
    type Patch = TaskPatch;

    fn apply_patch(&self, patch: &TaskPatch) -> Result<Patched<Self>, ValidationError> {
        let mut changes = FieldChanges::new();
        let name = required("name", &self.name, &patch.name, String::clone, &mut changes)?;
        let description = optional(
            "description",
            &self.description,
            &patch.description,
            String::clone,
            &mut changes,
        );
        let status = required(
            "status",
            &self.status,
            &patch.status,
            |status| status.as_str().to_string(),
            &mut changes,
        )?;
        let priority = required(
            "priority",
            &self.priority,
            &patch.priority,
            |priority| priority.as_str().to_string(),
            &mut changes,
        )?;
        let assignee = optional(
            "assignee",
            &self.assignee,
            &patch.assignee,
            String::clone,
            &mut changes,
        );
        let due_date = optional("due_date", &self.due_date, &patch.due_date, date, &mut changes);
        let sprint_id = optional(
            "sprint",
            &self.sprint_id,
            &patch.sprint,
            |id| id.to_string(),
            &mut changes,
        );

        let entity = Task {
            id: self.id,
            project_id: self.project_id,
            sprint_id,
            name,
            description,
            status,
            priority,
            assignee,
            due_date,
        };
        entity.validate()?;
        Ok(Patched { entity, changes })
    }
}

impl Patchable for Sprint {
    type Patch = SprintPatch;

    fn apply_patch(&self, patch: &SprintPatch) -> Result<Patched<Self>, ValidationError> {
        let mut changes = FieldChanges::new();
        let name = required("name", &self.name, &patch.name, String::clone, &mut changes)?;
        let goal = optional("goal", &self.goal, &patch.goal, String::clone, &mut changes);
        let status = required(
            "status",
            &self.status,
            &patch.status,
            |status| status.as_str().to_string(),
            &mut changes,
        )?;
        let start_date = optional(
            "start_date",
            &self.start_date,
            &patch.start_date,
            date,
            &mut changes,
        );
        let end_date = optional("end_date", &self.end_date, &patch.end_date, date, &mut changes);

        let entity = Sprint {
            id: self.id,
            project_id: self.project_id,
            name,
            goal,
            status,
            start_date,
            end_date,
        };
        entity.validate()?;
        Ok(Patched { entity, changes })
    }
}

impl Patchable for PullRequest {
    type Patch = PullRequestPatch;

    fn apply_patch(&self, patch: &PullRequestPatch) -> Result<Patched<Self>, ValidationError> {
        let mut changes = FieldChanges::new();
        let title = required("title", &self.title, &patch.title, String::clone, &mut changes)?;
        let url = optional("url", &self.url, &patch.url, String::clone, &mut changes);
        let status = required(
            "status",
            &self.status,
            &patch.status,
            |status| status.as_str().to_string(),
            &mut changes,
        )?;
        if self.merged && (changes.get("title").is_some() || changes.get("status").is_some()) {
            return Err(ValidationError::new(
                "status",
                "title and status of a merged pull request are frozen",
            ));
        }

        let entity = PullRequest {
            id: self.id,
            task_id: self.task_id,
            title,
            url,
            status,
            merged: self.merged,
            merged_by: self.merged_by.clone(),
        };
        entity.validate()?;
        Ok(Patched { entity, changes })
    }
}

impl PullRequest {
    /// Marks the pull request merged by `merged_by` (a user id or an external
    /// actor such as a webhook name).
    pub fn merge(&self, merged_by: &str) -> Result<Patched<Self>, ValidationError> {
        if self.merged {
            return Err(ValidationError::new("merged", "pull request is already merged"));
        }
        if self.status == PullRequestStatus::Closed {
            return Err(ValidationError::new(
                "status",
                "closed pull requests cannot be merged",
            ));
        }
        if merged_by.trim().is_empty() {
            return Err(ValidationError::blank("merged_by"));
        }

        let mut changes = FieldChanges::new();
        changes.push(
            "status",
            Some(self.status.as_str().to_string()),
            Some(PullRequestStatus::Merged.as_str().to_string()),
        );
        changes.push("merged", Some("false".to_string()), Some("true".to_string()));

        let entity = PullRequest {
            status: PullRequestStatus::Merged,
            merged: true,
            merged_by: Some(merged_by.to_string()),
            ..self.clone()
        };
        entity.validate()?;
        Ok(Patched { entity, changes })
    }
}
