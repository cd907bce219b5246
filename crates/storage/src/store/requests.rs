#![forbid(unsafe_code)]

use tl_core::ChangeRecord;
use tl_core::model::{Date, PullRequestStatus, SprintStatus, TaskPriority, TaskStatus};
use tl_core::patch::{PullRequestPatch, SprintPatch, TaskPatch};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCreateRequest {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectCreateRequest {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SprintCreateRequest {
    pub project_id: i64,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCreateRequest {
    pub project_id: i64,
    pub sprint_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee: Option<String>,
    pub due_date: Option<Date>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestCreateRequest {
    pub task_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub status: PullRequestStatus,
}

#[derive(Clone, Debug, Default)]
pub struct TaskPatchRequest {
    pub task_id: i64,
    pub author: String,
    pub patch: TaskPatch,
}

#[derive(Clone, Debug, Default)]
pub struct SprintPatchRequest {
    pub sprint_id: i64,
    pub author: String,
    pub patch: SprintPatch,
}

#[derive(Clone, Debug, Default)]
pub struct PullRequestPatchRequest {
    pub pull_request_id: i64,
    pub author: String,
    pub patch: PullRequestPatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestMergeRequest {
    pub pull_request_id: i64,
    /// User id or external actor name (e.g. a webhook user).
    pub merged_by: String,
}

/// Entity state after a committed edit, with the change records the edit wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edited<T, C> {
    pub entity: T,
    pub changes: Vec<ChangeRecord<C>>,
}
