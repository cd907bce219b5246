#![forbid(unsafe_code)]

use super::query::Queryable;
use super::support::date_to_sql;
use super::*;
use rusqlite::types::ToSql;
use rusqlite::{ErrorCode, OptionalExtension, params};
use tl_core::ValidationError;
use tl_core::model::{Project, PullRequest, Sprint, Task, User};

impl SqliteStore {
    pub fn create_user(&mut self, request: UserCreateRequest) -> Result<User, StoreError> {
        let user = User {
            id: request.id.trim().to_string(),
            display_name: request.display_name,
            email: request.email,
        };
        user.validate()?;
        self.write(|ctx| {
            ctx.tx()
                .execute(
                    "INSERT INTO users(id, display_name, email, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                    params![user.id, user.display_name, user.email, ctx.now_ms()],
                )
                .map_err(|err| map_insert_conflict(err, "id"))?;
            Ok(user)
        })
    }

    pub fn create_project(&mut self, request: ProjectCreateRequest) -> Result<Project, StoreError> {
        let project = Project {
            id: 0,
            key: request.key.trim().to_string(),
            name: request.name,
            description: request.description,
        };
        project.validate()?;
        self.write(|ctx| {
            let tx = ctx.tx();
            tx.execute(
                "INSERT INTO projects(key, name, description, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![project.key, project.name, project.description, ctx.now_ms()],
            )
            .map_err(|err| map_insert_conflict(err, "key"))?;
            Ok(Project {
                id: tx.last_insert_rowid(),
                ..project
            })
        })
    }

    pub fn create_sprint(&mut self, request: SprintCreateRequest) -> Result<Sprint, StoreError> {
        let sprint = Sprint {
            id: 0,
            project_id: request.project_id,
            name: request.name,
            goal: request.goal,
            status: request.status,
            start_date: request.start_date,
            end_date: request.end_date,
        };
        sprint.validate()?;
        self.write(|ctx| {
            let tx = ctx.tx();
            require_reference_tx::<Project>(tx, "project", &sprint.project_id)?;
            tx.execute(
                "INSERT INTO sprints(project_id, name, goal, status, start_date, end_date, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    sprint.project_id,
                    sprint.name,
                    sprint.goal,
                    sprint.status.as_str(),
                    date_to_sql(sprint.start_date),
                    date_to_sql(sprint.end_date),
                    ctx.now_ms(),
                ],
            )?;
            Ok(Sprint {
                id: tx.last_insert_rowid(),
                ..sprint
            })
        })
    }

    pub fn create_task(&mut self, request: TaskCreateRequest) -> Result<Task, StoreError> {
        let task = Task {
            id: 0,
            project_id: request.project_id,
            sprint_id: request.sprint_id,
            name: request.name,
            description: request.description,
            status: request.status,
            priority: request.priority,
            assignee: request.assignee,
            due_date: request.due_date,
        };
        task.validate()?;
        self.write(|ctx| {
            let tx = ctx.tx();
            require_reference_tx::<Project>(tx, "project", &task.project_id)?;
            check_task_references_tx(tx, &task)?;
            tx.execute(
                "INSERT INTO tasks(project_id, sprint_id, name, description, status, priority, assignee, due_date, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    task.project_id,
                    task.sprint_id,
                    task.name,
                    task.description,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.assignee,
                    date_to_sql(task.due_date),
                    ctx.now_ms(),
                ],
            )?;
            Ok(Task {
                id: tx.last_insert_rowid(),
                ..task
            })
        })
    }

    pub fn create_pull_request(
        &mut self,
        request: PullRequestCreateRequest,
    ) -> Result<PullRequest, StoreError> {
        let pull_request = PullRequest {
            id: 0,
            task_id: request.task_id,
            title: request.title,
            url: request.url,
            status: request.status,
            merged: false,
            merged_by: None,
        };
        pull_request.validate()?;
        self.write(|ctx| {
            let tx = ctx.tx();
            require_reference_tx::<Task>(tx, "task", &pull_request.task_id)?;
            tx.execute(
                "INSERT INTO pull_requests(task_id, title, url, status, merged, merged_by, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?5)",
                params![
                    pull_request.task_id,
                    pull_request.title,
                    pull_request.url,
                    pull_request.status.as_str(),
                    ctx.now_ms(),
                ],
            )?;
            Ok(PullRequest {
                id: tx.last_insert_rowid(),
                ..pull_request
            })
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        fetch_by_id_tx(&self.conn, &id)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        fetch_by_id_tx(&self.conn, &id)
    }

    pub fn get_sprint(&self, id: i64) -> Result<Option<Sprint>, StoreError> {
        fetch_by_id_tx(&self.conn, &id)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        fetch_by_id_tx(&self.conn, &id)
    }

    pub fn get_pull_request(&self, id: i64) -> Result<Option<PullRequest>, StoreError> {
        fetch_by_id_tx(&self.conn, &id)
    }

    /// Removes the task and its pull requests. Their change history stays.
    pub fn delete_task(&mut self, task_id: i64) -> Result<bool, StoreError> {
        self.write(|ctx| {
            let deleted = ctx
                .tx()
                .execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if deleted > 0 {
                tracing::info!(task_id, "task deleted");
            }
            Ok(deleted > 0)
        })
    }
}

pub(in crate::store) fn fetch_by_id_tx<T: Queryable>(
    conn: &Connection,
    id: &dyn ToSql,
) -> Result<Option<T>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} t0 WHERE t0.id = ?1",
        support::select_list("t0", T::columns()),
        T::ENTITY.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

/// Loads the edit target or fails with `UnknownId`.
pub(in crate::store) fn require_by_id_tx<T: Queryable>(
    conn: &Connection,
    id: i64,
) -> Result<T, StoreError> {
    fetch_by_id_tx(conn, &id)?.ok_or_else(|| StoreError::unknown(T::ENTITY.name(), id))
}

fn exists_tx<T: Queryable>(conn: &Connection, id: &dyn ToSql) -> Result<bool, StoreError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", T::ENTITY.table());
    Ok(conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// A referenced row that is missing is a caller input problem, not a lookup miss.
fn require_reference_tx<T: Queryable>(
    conn: &Connection,
    field: &'static str,
    id: &dyn ToSql,
) -> Result<(), StoreError> {
    if exists_tx::<T>(conn, id)? {
        return Ok(());
    }
    Err(ValidationError::new(field, format!("referenced {} does not exist", T::ENTITY.name())).into())
}

/// Assignee must be a known user; the sprint must exist in the task's project.
pub(in crate::store) fn check_task_references_tx(
    conn: &Connection,
    task: &Task,
) -> Result<(), StoreError> {
    if let Some(assignee) = task.assignee.as_deref() {
        require_reference_tx::<User>(conn, "assignee", &assignee)?;
    }
    if let Some(sprint_id) = task.sprint_id {
        let project_id: Option<i64> = conn
            .query_row(
                "SELECT project_id FROM sprints WHERE id = ?1",
                params![sprint_id],
                |row| row.get(0),
            )
            .optional()?;
        match project_id {
            None => {
                return Err(ValidationError::new("sprint", "referenced sprint does not exist").into());
            }
            Some(project_id) if project_id != task.project_id => {
                return Err(ValidationError::new(
                    "sprint",
                    "sprint belongs to a different project",
                )
                .into());
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn map_insert_conflict(err: rusqlite::Error, field: &'static str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            ValidationError::new(field, "already exists").into()
        }
        other => StoreError::Sql(other),
    }
}
