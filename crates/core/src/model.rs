#![forbid(unsafe_code)]

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use time::macros::format_description;

pub use time::Date;

pub const TASK_NAME_MAX_CHARS: usize = 255;
pub const TASK_DESCRIPTION_MAX_CHARS: usize = 10_000;
pub const SPRINT_NAME_MAX_CHARS: usize = 120;
pub const SPRINT_GOAL_MAX_CHARS: usize = 2_000;
pub const PULL_REQUEST_TITLE_MAX_CHARS: usize = 255;
pub const PULL_REQUEST_URL_MAX_CHARS: usize = 2_048;
pub const USER_ID_MAX_CHARS: usize = 64;

/// ISO `YYYY-MM-DD`; sorts lexicographically in date order.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(TaskStatus::Open),
            "in_progress" => Some(TaskStatus::InProgress),
            "review" => Some(TaskStatus::Review),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "critical" => Some(TaskPriority::Critical),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    Planned,
    Active,
    Closed,
}

impl SprintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SprintStatus::Planned => "planned",
            SprintStatus::Active => "active",
            SprintStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(SprintStatus::Planned),
            "active" => Some(SprintStatus::Active),
            "closed" => Some(SprintStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestStatus {
    Open,
    Closed,
    Merged,
}

impl PullRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PullRequestStatus::Open => "open",
            PullRequestStatus::Closed => "closed",
            PullRequestStatus::Merged => "merged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(PullRequestStatus::Open),
            "closed" => Some(PullRequestStatus::Closed),
            "merged" => Some(PullRequestStatus::Merged),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("id", &self.id, USER_ID_MAX_CHARS)?;
        if self.id.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return Err(ValidationError::new(
                "id",
                "must not contain whitespace or control characters",
            ));
        }
        require_text("display_name", &self.display_name, USER_ID_MAX_CHARS * 2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
}

impl Project {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("key", &self.key, 16)?;
        require_text("name", &self.name, TASK_NAME_MAX_CHARS)?;
        optional_text("description", self.description.as_deref(), TASK_DESCRIPTION_MAX_CHARS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprint {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl Sprint {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, SPRINT_NAME_MAX_CHARS)?;
        optional_text("goal", self.goal.as_deref(), SPRINT_GOAL_MAX_CHARS)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            return Err(ValidationError::new(
                "end_date",
                "must not be earlier than start_date",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub sprint_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee: Option<String>,
    pub due_date: Option<Date>,
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, TASK_NAME_MAX_CHARS)?;
        optional_text(
            "description",
            self.description.as_deref(),
            TASK_DESCRIPTION_MAX_CHARS,
        )?;
        if let Some(assignee) = self.assignee.as_deref() {
            require_text("assignee", assignee, USER_ID_MAX_CHARS)?;
        }
        if let Some(sprint_id) = self.sprint_id
            && sprint_id <= 0
        {
            return Err(ValidationError::new("sprint", "must be a positive id"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub status: PullRequestStatus,
    pub merged: bool,
    pub merged_by: Option<String>,
}

impl PullRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, PULL_REQUEST_TITLE_MAX_CHARS)?;
        optional_text("url", self.url.as_deref(), PULL_REQUEST_URL_MAX_CHARS)?;
        if self.merged != (self.status == PullRequestStatus::Merged) {
            return Err(ValidationError::new(
                "status",
                "merged status is only reachable through a merge",
            ));
        }
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::blank(field));
    }
    if value.chars().count() > max_chars {
        return Err(ValidationError::too_long(field, max_chars));
    }
    Ok(())
}

fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) if value.chars().count() > max_chars => {
            Err(ValidationError::too_long(field, max_chars))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn dates_render_as_sortable_iso_strings() {
        assert_eq!(format_date(date!(2024 - 03 - 07)), "2024-03-07");
        assert_eq!(parse_date("2024-03-07"), Some(date!(2024 - 03 - 07)));
        assert_eq!(parse_date("03/07/2024"), None);
        assert!(format_date(date!(2024 - 03 - 07)) < format_date(date!(2024 - 11 - 01)));
    }

    #[test]
    fn sprint_rejects_inverted_date_range() {
        let sprint = Sprint {
            id: 1,
            project_id: 1,
            name: "Sprint 1".to_string(),
            goal: None,
            status: SprintStatus::Planned,
            start_date: Some(date!(2024 - 05 - 10)),
            end_date: Some(date!(2024 - 05 - 01)),
        };
        let err = sprint.validate().expect_err("inverted range");
        assert_eq!(err.field, "end_date");
    }

    #[test]
    fn user_id_rejects_whitespace() {
        let user = User {
            id: "al ice".to_string(),
            display_name: "Alice".to_string(),
            email: None,
        };
        assert!(user.validate().is_err());
    }
}
