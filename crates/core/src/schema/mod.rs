#![forbid(unsafe_code)]

//! Static field registry for every queryable entity type, and the resolver
//! that walks a dotted path through it.

use crate::QueryError;
use crate::criteria::FieldPath;
use std::collections::VecDeque;


/// Upper bound on alias expansions while resolving one path.
const MAX_ALIAS_EXPANSIONS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Project,
    Sprint,
    Task,
    PullRequest,
    TaskChange,
    SprintChange,
    PullRequestChange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Integer,
    Text,
    Bool,
    Date,
    Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar {
        column: &'static str,
        ty: ScalarType,
    },
    Relation {
        column: &'static str,
        target: EntityType,
    },
    /// Shorthand for another dotted path on the same entity type.
    Alias(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn scalar(name: &'static str, ty: ScalarType) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Scalar { column: name, ty },
    }
}

const fn relation(name: &'static str, column: &'static str, target: EntityType) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Relation { column, target },
    }
}

const fn alias(name: &'static str, path: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Alias(path),
    }
}

const USER_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Text),
    scalar("display_name", ScalarType::Text),
    scalar("email", ScalarType::Text),
];

const PROJECT_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    scalar("key", ScalarType::Text),
    scalar("name", ScalarType::Text),
    scalar("description", ScalarType::Text),
];

const SPRINT_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    relation("project", "project_id", EntityType::Project),
    scalar("name", ScalarType::Text),
    scalar("goal", ScalarType::Text),
    scalar("status", ScalarType::Text),
    scalar("start_date", ScalarType::Date),
    scalar("end_date", ScalarType::Date),
];

const TASK_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    relation("project", "project_id", EntityType::Project),
    relation("sprint", "sprint_id", EntityType::Sprint),
    scalar("name", ScalarType::Text),
    scalar("description", ScalarType::Text),
    scalar("status", ScalarType::Text),
    scalar("priority", ScalarType::Text),
    relation("assignee", "assignee", EntityType::User),
    scalar("due_date", ScalarType::Date),
];

const PULL_REQUEST_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    relation("task", "task_id", EntityType::Task),
    scalar("title", ScalarType::Text),
    scalar("url", ScalarType::Text),
    scalar("status", ScalarType::Text),
    scalar("merged", ScalarType::Bool),
    scalar("merged_by", ScalarType::Text),
];

const TASK_CHANGE_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    scalar("subject_id", ScalarType::Integer),
    relation("task", "subject_id", EntityType::Task),
    scalar("author", ScalarType::Text),
    scalar("occurred_at_ms", ScalarType::Timestamp),
    scalar("kind", ScalarType::Text),
    scalar("old_value", ScalarType::Text),
    scalar("new_value", ScalarType::Text),
];

const SPRINT_CHANGE_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    scalar("subject_id", ScalarType::Integer),
    relation("sprint", "subject_id", EntityType::Sprint),
    scalar("author", ScalarType::Text),
    scalar("occurred_at_ms", ScalarType::Timestamp),
    scalar("kind", ScalarType::Text),
    scalar("old_value", ScalarType::Text),
    scalar("new_value", ScalarType::Text),
];

const PULL_REQUEST_CHANGE_FIELDS: &[FieldDef] = &[
    scalar("id", ScalarType::Integer),
    scalar("subject_id", ScalarType::Integer),
    relation("pull_request", "subject_id", EntityType::PullRequest),
    alias("task", "pull_request.task"),
    scalar("author", ScalarType::Text),
    scalar("occurred_at_ms", ScalarType::Timestamp),
    scalar("kind", ScalarType::Text),
    scalar("old_value", ScalarType::Text),
    scalar("new_value", ScalarType::Text),
    scalar("merged", ScalarType::Bool),
    scalar("merged_by", ScalarType::Text),
];

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::User,
        EntityType::Project,
        EntityType::Sprint,
        EntityType::Task,
        EntityType::PullRequest,
        EntityType::TaskChange,
        EntityType::SprintChange,
        EntityType::PullRequestChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Project => "project",
            EntityType::Sprint => "sprint",
            EntityType::Task => "task",
            EntityType::PullRequest => "pull_request",
            EntityType::TaskChange => "task_change",
            EntityType::SprintChange => "sprint_change",
            EntityType::PullRequestChange => "pull_request_change",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityType::User => "users",
            EntityType::Project => "projects",
            EntityType::Sprint => "sprints",
            EntityType::Task => "tasks",
            EntityType::PullRequest => "pull_requests",
            EntityType::TaskChange => "task_changes",
            EntityType::SprintChange => "sprint_changes",
            EntityType::PullRequestChange => "pull_request_changes",
        }
    }

    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            EntityType::User => USER_FIELDS,
            EntityType::Project => PROJECT_FIELDS,
            EntityType::Sprint => SPRINT_FIELDS,
            EntityType::Task => TASK_FIELDS,
            EntityType::PullRequest => PULL_REQUEST_FIELDS,
            EntityType::TaskChange => TASK_CHANGE_FIELDS,
            EntityType::SprintChange => SPRINT_CHANGE_FIELDS,
            EntityType::PullRequestChange => PULL_REQUEST_CHANGE_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// Type of the `id` column, used when a relation is compared directly.
    pub fn id_type(self) -> ScalarType {
        match self {
            EntityType::User => ScalarType::Text,
            _ => ScalarType::Integer,
        }
    }

    /// Walks `path` from this type. Every segment but the last must name a
    /// relation (or an alias ending in one); the last may name anything.
    pub fn resolve(self, path: &FieldPath) -> Result<ResolvedPath, QueryError> {
        let mut pending: VecDeque<&'static str> = VecDeque::new();
        let mut owned: Vec<String> = Vec::new();
        let mut remaining: VecDeque<String> = path.segments().map(str::to_string).collect();
        let mut expansions = 0usize;

        let mut current = self;
        let mut steps = Vec::new();

        loop {
            let segment = match pending.pop_front() {
                Some(segment) => segment.to_string(),
                None => match remaining.pop_front() {
                    Some(segment) => segment,
                    None => break,
                },
            };
            let is_last = pending.is_empty() && remaining.is_empty();

            let Some(field) = current.field(&segment) else {
                return Err(QueryError::UnknownField {
                    entity: current.name(),
                    segment,
                });
            };

            match field.kind {
                FieldKind::Alias(target) => {
                    expansions += 1;
                    if expansions > MAX_ALIAS_EXPANSIONS {
                        return Err(QueryError::UnknownField {
                            entity: current.name(),
                            segment,
                        });
                    }
                    for part in target.split('.').rev() {
                        pending.push_front(part);
                    }
                }
                FieldKind::Scalar { column, ty } => {
                    if !is_last {
                        return Err(QueryError::NotARelation {
                            entity: current.name(),
                            segment,
                        });
                    }
                    return Ok(ResolvedPath {
                        path: path.to_string(),
                        steps,
                        column,
                        ty,
                    });
                }
                FieldKind::Relation { column, target } => {
                    if is_last {
                        return Ok(ResolvedPath {
                            path: path.to_string(),
                            steps,
                            column,
                            ty: target.id_type(),
                        });
                    }
                    owned.push(field.name.to_string());
                    steps.push(RelationStep {
                        prefix: owned.join("."),
                        column,
                        target,
                    });
                    current = target;
                }
            }
        }

        // Only reachable when the path ends in an alias expanding to nothing.
        Err(QueryError::EmptyPath)
    }
}

/// One relation traversed while resolving a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationStep {
    /// Canonical path up to and including this relation, e.g. `pull_request.task`.
    pub prefix: String,
    /// Foreign-key column on the owning side.
    pub column: &'static str,
    pub target: EntityType,
}

/// Result of walking a path: the joins it needs and the column it ends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    path: String,
    steps: Vec<RelationStep>,
    column: &'static str,
    ty: ScalarType,
}

impl ResolvedPath {
    /// Path as the caller wrote it.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn steps(&self) -> &[RelationStep] {
        &self.steps
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn ty(&self) -> ScalarType {
        self.ty
    }
}
