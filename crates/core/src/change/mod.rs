#![forbid(unsafe_code)]

//! Audit records. Each entity family is one enum whose variant is the stored
//! `kind` discriminator; all variants of a family share one table whose payload
//! columns are the union of the variants' fields.

use crate::ChangeDecodeError;
use crate::schema::EntityType;
use std::collections::BTreeMap;
use std::fmt::Debug;

#[cfg(test)]
mod tests;

/// Union of every payload column across all families.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeColumns {
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub merged: Option<bool>,
    pub merged_by: Option<String>,
}

const VALUE_CHANGE_COLUMNS: &[&str] = &[
    "id",
    "subject_id",
    "author",
    "occurred_at_ms",
    "kind",
    "old_value",
    "new_value",
];

/// Old and new value of one field, stringified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl ValueChange {
    pub fn new(old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            old: old.map(str::to_string),
            new: new.map(str::to_string),
        }
    }

    fn columns(&self) -> ChangeColumns {
        ChangeColumns {
            old_value: self.old.clone(),
            new_value: self.new.clone(),
            ..ChangeColumns::default()
        }
    }

    fn from_columns(columns: ChangeColumns) -> Self {
        Self {
            old: columns.old_value,
            new: columns.new_value,
        }
    }
}

pub trait ChangeFamily: Clone + Debug + PartialEq + Sized {
    const FAMILY: &'static str;
    const TABLE: &'static str;
    /// Schema type of the family's change table.
    const ENTITY: EntityType;
    /// Stored columns in select order: the common header, then the payload
    /// columns this family uses.
    const COLUMNS: &'static [&'static str] = VALUE_CHANGE_COLUMNS;

    fn kind(&self) -> &'static str;

    /// Entity field this change describes.
    fn field(&self) -> &'static str;

    /// Maps a changed field to its variant; `None` for fields the family does
    /// not track.
    fn from_field(field: &str, old: Option<&str>, new: Option<&str>, author: &str)
    -> Option<Self>;

    fn to_columns(&self) -> ChangeColumns;

    fn from_columns(kind: &str, columns: ChangeColumns) -> Result<Self, ChangeDecodeError>;

    /// Value the field holds after this change, as used by [`replay`].
    fn value_after(&self) -> Option<String> {
        self.to_columns().new_value
    }
}

/// One persisted audit entry. Fields are fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord<C> {
    id: i64,
    subject_id: i64,
    author: String,
    occurred_at_ms: i64,
    change: C,
}

impl<C: ChangeFamily> ChangeRecord<C> {
    pub fn new(id: i64, subject_id: i64, author: String, occurred_at_ms: i64, change: C) -> Self {
        Self {
            id,
            subject_id,
            author,
            occurred_at_ms,
            change,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn occurred_at_ms(&self) -> i64 {
        self.occurred_at_ms
    }

    pub fn change(&self) -> &C {
        &self.change
    }

    pub fn kind(&self) -> &'static str {
        self.change.kind()
    }
}

/// Folds an ordered history into the last recorded value of each field.
pub fn replay<C: ChangeFamily>(history: &[ChangeRecord<C>]) -> BTreeMap<&'static str, Option<String>> {
    let mut state = BTreeMap::new();
    for record in history {
        state.insert(record.change.field(), record.change.value_after());
    }
    state
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskChange {
    Name(ValueChange),
    Description(ValueChange),
    Status(ValueChange),
    Priority(ValueChange),
    Assignee(ValueChange),
    DueDate(ValueChange),
    Sprint(ValueChange),
}

impl TaskChange {
    pub fn values(&self) -> &ValueChange {
        match self {
            TaskChange::Name(change)
            | TaskChange::Description(change)
            | TaskChange::Status(change)
            | TaskChange::Priority(change)
            | TaskChange::Assignee(change)
            | TaskChange::DueDate(change)
            | TaskChange::Sprint(change) => change,
        }
    }
}

impl ChangeFamily for TaskChange {
    const FAMILY: &'static str = "task";
    const TABLE: &'static str = "task_changes";
    const ENTITY: EntityType = EntityType::TaskChange;

    fn kind(&self) -> &'static str {
        match self {
            TaskChange::Name(_) => "name_change",
            TaskChange::Description(_) => "description_change",
            TaskChange::Status(_) => "status_change",
            TaskChange::Priority(_) => "priority_change",
            TaskChange::Assignee(_) => "assignee_change",
            TaskChange::DueDate(_) => "due_date_change",
            TaskChange::Sprint(_) => "sprint_change",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            TaskChange::Name(_) => "name",
            TaskChange::Description(_) => "description",
            TaskChange::Status(_) => "status",
            TaskChange::Priority(_) => "priority",
            TaskChange::Assignee(_) => "assignee",
            TaskChange::DueDate(_) => "due_date",
            TaskChange::Sprint(_) => "sprint",
        }
    }

    fn from_field(
        field: &str,
        old: Option<&str>,
        new: Option<&str>,
        _author: &str,
    ) -> Option<Self> {
        let change = ValueChange::new(old, new);
        match field {
            "name" => Some(TaskChange::Name(change)),
            "description" => Some(TaskChange::Description(change)),
            "status" => Some(TaskChange::Status(change)),
            "priority" => Some(TaskChange::Priority(change)),
            "assignee" => Some(TaskChange::Assignee(change)),
            "due_date" => Some(TaskChange::DueDate(change)),
            "sprint" => Some(TaskChange::Sprint(change)),
            _ => None,
        }
    }

    fn to_columns(&self) -> ChangeColumns {
        self.values().columns()
    }

    fn from_columns(kind: &str, columns: ChangeColumns) -> Result<Self, ChangeDecodeError> {
        let change = ValueChange::from_columns(columns);
        match kind {
            "name_change" => Ok(TaskChange::Name(change)),
            "description_change" => Ok(TaskChange::Description(change)),
            "status_change" => Ok(TaskChange::Status(change)),
            "priority_change" => Ok(TaskChange::Priority(change)),
            "assignee_change" => Ok(TaskChange::Assignee(change)),
            "due_date_change" => Ok(TaskChange::DueDate(change)),
            "sprint_change" => Ok(TaskChange::Sprint(change)),
            other => Err(ChangeDecodeError::UnknownKind {
                family: Self::FAMILY,
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SprintChange {
    Name(ValueChange),
    Goal(ValueChange),
    Status(ValueChange),
    StartDate(ValueChange),
    EndDate(ValueChange),
}

impl SprintChange {
    pub fn values(&self) -> &ValueChange {
        match self {
            SprintChange::Name(change)
            | SprintChange::Goal(change)
            | SprintChange::Status(change)
            | SprintChange::StartDate(change)
            | SprintChange::EndDate(change) => change,
        }
    }
}

impl ChangeFamily for SprintChange {
    const FAMILY: &'static str = "sprint";
    const TABLE: &'static str = "sprint_changes";
    const ENTITY: EntityType = EntityType::SprintChange;

    fn kind(&self) -> &'static str {
        match self {
            SprintChange::Name(_) => "name_change",
            SprintChange::Goal(_) => "goal_change",
            SprintChange::Status(_) => "status_change",
            SprintChange::StartDate(_) => "start_date_change",
            SprintChange::EndDate(_) => "end_date_change",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            SprintChange::Name(_) => "name",
            SprintChange::Goal(_) => "goal",
            SprintChange::Status(_) => "status",
            SprintChange::StartDate(_) => "start_date",
            SprintChange::EndDate(_) => "end_date",
        }
    }

    fn from_field(
        field: &str,
        old: Option<&str>,
        new: Option<&str>,
        _author: &str,
    ) -> Option<Self> {
        let change = ValueChange::new(old, new);
        match field {
            "name" => Some(SprintChange::Name(change)),
            "goal" => Some(SprintChange::Goal(change)),
            "status" => Some(SprintChange::Status(change)),
            "start_date" => Some(SprintChange::StartDate(change)),
            "end_date" => Some(SprintChange::EndDate(change)),
            _ => None,
        }
    }

    fn to_columns(&self) -> ChangeColumns {
        self.values().columns()
    }

    fn from_columns(kind: &str, columns: ChangeColumns) -> Result<Self, ChangeDecodeError> {
        let change = ValueChange::from_columns(columns);
        match kind {
            "name_change" => Ok(SprintChange::Name(change)),
            "goal_change" => Ok(SprintChange::Goal(change)),
            "status_change" => Ok(SprintChange::Status(change)),
            "start_date_change" => Ok(SprintChange::StartDate(change)),
            "end_date_change" => Ok(SprintChange::EndDate(change)),
            other => Err(ChangeDecodeError::UnknownKind {
                family: Self::FAMILY,
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullRequestChange {
    Title(ValueChange),
    Status(ValueChange),
    Url(ValueChange),
    Merged { merged: bool, merged_by: String },
}

impl ChangeFamily for PullRequestChange {
    const FAMILY: &'static str = "pull_request";
    const TABLE: &'static str = "pull_request_changes";
    const ENTITY: EntityType = EntityType::PullRequestChange;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "subject_id",
        "author",
        "occurred_at_ms",
        "kind",
        "old_value",
        "new_value",
        "merged",
        "merged_by",
    ];

    fn kind(&self) -> &'static str {
        match self {
            PullRequestChange::Title(_) => "title_change",
            PullRequestChange::Status(_) => "status_change",
            PullRequestChange::Url(_) => "url_change",
            PullRequestChange::Merged { .. } => "pr_merged",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            PullRequestChange::Title(_) => "title",
            PullRequestChange::Status(_) => "status",
            PullRequestChange::Url(_) => "url",
            PullRequestChange::Merged { .. } => "merged",
        }
    }

    fn from_field(
        field: &str,
        old: Option<&str>,
        new: Option<&str>,
        author: &str,
    ) -> Option<Self> {
        let change = ValueChange::new(old, new);
        match field {
            "title" => Some(PullRequestChange::Title(change)),
            "status" => Some(PullRequestChange::Status(change)),
            "url" => Some(PullRequestChange::Url(change)),
            "merged" => Some(PullRequestChange::Merged {
                merged: new == Some("true"),
                merged_by: author.to_string(),
            }),
            _ => None,
        }
    }

    fn to_columns(&self) -> ChangeColumns {
        match self {
            PullRequestChange::Title(change)
            | PullRequestChange::Status(change)
            | PullRequestChange::Url(change) => change.columns(),
            PullRequestChange::Merged { merged, merged_by } => ChangeColumns {
                merged: Some(*merged),
                merged_by: Some(merged_by.clone()),
                ..ChangeColumns::default()
            },
        }
    }

    fn from_columns(kind: &str, columns: ChangeColumns) -> Result<Self, ChangeDecodeError> {
        match kind {
            "title_change" => Ok(PullRequestChange::Title(ValueChange::from_columns(columns))),
            "status_change" => Ok(PullRequestChange::Status(ValueChange::from_columns(columns))),
            "url_change" => Ok(PullRequestChange::Url(ValueChange::from_columns(columns))),
            "pr_merged" => {
                let missing = |column| ChangeDecodeError::MissingColumn {
                    family: Self::FAMILY,
                    kind: "pr_merged",
                    column,
                };
                Ok(PullRequestChange::Merged {
                    merged: columns.merged.ok_or_else(|| missing("merged"))?,
                    merged_by: columns.merged_by.ok_or_else(|| missing("merged_by"))?,
                })
            }
            other => Err(ChangeDecodeError::UnknownKind {
                family: Self::FAMILY,
                kind: other.to_string(),
            }),
        }
    }

    fn value_after(&self) -> Option<String> {
        match self {
            PullRequestChange::Merged { merged, .. } => Some(merged.to_string()),
            other => other.to_columns().new_value,
        }
    }
}
