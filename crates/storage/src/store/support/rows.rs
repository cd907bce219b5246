#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::Row;
use tl_core::model::{
    Date, Project, PullRequest, PullRequestStatus, Sprint, SprintStatus, Task, TaskPriority,
    TaskStatus, User, format_date, parse_date,
};
use tl_core::{ChangeColumns, ChangeFamily, ChangeRecord};

pub(in crate::store) const USER_COLUMNS: &[&str] = &["id", "display_name", "email"];

pub(in crate::store) const PROJECT_COLUMNS: &[&str] = &["id", "key", "name", "description"];

pub(in crate::store) const SPRINT_COLUMNS: &[&str] = &[
    "id",
    "project_id",
    "name",
    "goal",
    "status",
    "start_date",
    "end_date",
];

pub(in crate::store) const TASK_COLUMNS: &[&str] = &[
    "id",
    "project_id",
    "sprint_id",
    "name",
    "description",
    "status",
    "priority",
    "assignee",
    "due_date",
];

pub(in crate::store) const PULL_REQUEST_COLUMNS: &[&str] = &[
    "id",
    "task_id",
    "title",
    "url",
    "status",
    "merged",
    "merged_by",
];

pub(in crate::store) fn select_list(alias: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(in crate::store) fn date_to_sql(date: Option<Date>) -> Option<String> {
    date.map(format_date)
}

fn date_from_sql(table: &'static str, raw: Option<String>) -> Result<Option<Date>, StoreError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| StoreError::invalid_row(table, format!("date {raw:?}"))),
    }
}

fn parse_enum<T>(
    table: &'static str,
    raw: String,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, StoreError> {
    parse(&raw).ok_or_else(|| StoreError::invalid_row(table, format!("status {raw:?}")))
}

pub(in crate::store) fn user_from_row(row: &Row<'_>) -> Result<User, StoreError> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        email: row.get(2)?,
    })
}

pub(in crate::store) fn project_from_row(row: &Row<'_>) -> Result<Project, StoreError> {
    Ok(Project {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
    })
}

pub(in crate::store) fn sprint_from_row(row: &Row<'_>) -> Result<Sprint, StoreError> {
    Ok(Sprint {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        goal: row.get(3)?,
        status: parse_enum("sprints", row.get(4)?, SprintStatus::parse)?,
        start_date: date_from_sql("sprints", row.get(5)?)?,
        end_date: date_from_sql("sprints", row.get(6)?)?,
    })
}

pub(in crate::store) fn task_from_row(row: &Row<'_>) -> Result<Task, StoreError> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        sprint_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        status: parse_enum("tasks", row.get(5)?, TaskStatus::parse)?,
        priority: parse_enum("tasks", row.get(6)?, TaskPriority::parse)?,
        assignee: row.get(7)?,
        due_date: date_from_sql("tasks", row.get(8)?)?,
    })
}

pub(in crate::store) fn pull_request_from_row(row: &Row<'_>) -> Result<PullRequest, StoreError> {
    Ok(PullRequest {
        id: row.get(0)?,
        task_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        status: parse_enum("pull_requests", row.get(4)?, PullRequestStatus::parse)?,
        merged: row.get::<_, i64>(5)? != 0,
        merged_by: row.get(6)?,
    })
}

pub(in crate::store) fn change_from_row<C: ChangeFamily>(
    row: &Row<'_>,
) -> Result<ChangeRecord<C>, StoreError> {
    let kind: String = row.get(4)?;
    let mut columns = ChangeColumns {
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        ..ChangeColumns::default()
    };
    if C::COLUMNS.contains(&"merged") {
        columns.merged = row.get::<_, Option<i64>>(7)?.map(|merged| merged != 0);
        columns.merged_by = row.get(8)?;
    }
    let change = C::from_columns(&kind, columns)?;
    Ok(ChangeRecord::new(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        change,
    ))
}
