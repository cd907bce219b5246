#![forbid(unsafe_code)]

//! Edit services: resolve a patch against the stored row, write the new row
//! and its change records in one transaction.

use super::changelog::record_changes_tx;
use super::entities::{check_task_references_tx, require_by_id_tx};
use super::support::date_to_sql;
use super::*;
use rusqlite::params;
use tl_core::model::{PullRequest, Sprint, Task};
use tl_core::{
    ChangeRecord, FieldChanges, Patchable, Patched, PullRequestChange, SprintChange, TaskChange,
    ValidationError,
};

const AFTER_ENTITY_UPDATE: &str = "after_entity_update";

impl SqliteStore {
    pub fn patch_task(
        &mut self,
        request: TaskPatchRequest,
    ) -> Result<Edited<Task, TaskChange>, StoreError> {
        require_author(&request.author)?;
        let edited = self.write(|ctx| {
            let tx = ctx.tx();
            let current: Task = require_by_id_tx(tx, request.task_id)?;
            let Patched { entity, changes } = current.apply_patch(&request.patch)?;
            if changes.is_empty() {
                return Ok(unchanged(entity));
            }
            if changes.get("assignee").is_some() || changes.get("sprint").is_some() {
                check_task_references_tx(tx, &entity)?;
            }
            update_task_tx(ctx, &entity)?;
            let records = audit_tx::<TaskChange>(ctx, entity.id, &request.author, &changes)?;
            Ok(Edited {
                entity,
                changes: records,
            })
        })?;
        tracing::info!(
            task_id = edited.entity.id,
            changes = edited.changes.len(),
            "task patched"
        );
        Ok(edited)
    }

    pub fn patch_sprint(
        &mut self,
        request: SprintPatchRequest,
    ) -> Result<Edited<Sprint, SprintChange>, StoreError> {
        require_author(&request.author)?;
        let edited = self.write(|ctx| {
            let current: Sprint = require_by_id_tx(ctx.tx(), request.sprint_id)?;
            let Patched { entity, changes } = current.apply_patch(&request.patch)?;
            if changes.is_empty() {
                return Ok(unchanged(entity));
            }
            update_sprint_tx(ctx, &entity)?;
            let records = audit_tx::<SprintChange>(ctx, entity.id, &request.author, &changes)?;
            Ok(Edited {
                entity,
                changes: records,
            })
        })?;
        tracing::info!(
            sprint_id = edited.entity.id,
            changes = edited.changes.len(),
            "sprint patched"
        );
        Ok(edited)
    }

    pub fn patch_pull_request(
        &mut self,
        request: PullRequestPatchRequest,
    ) -> Result<Edited<PullRequest, PullRequestChange>, StoreError> {
        require_author(&request.author)?;
        let edited = self.write(|ctx| {
            let current: PullRequest = require_by_id_tx(ctx.tx(), request.pull_request_id)?;
            let Patched { entity, changes } = current.apply_patch(&request.patch)?;
            if changes.is_empty() {
                return Ok(unchanged(entity));
            }
            update_pull_request_tx(ctx, &entity)?;
            let records =
                audit_tx::<PullRequestChange>(ctx, entity.id, &request.author, &changes)?;
            Ok(Edited {
                entity,
                changes: records,
            })
        })?;
        tracing::info!(
            pull_request_id = edited.entity.id,
            changes = edited.changes.len(),
            "pull request patched"
        );
        Ok(edited)
    }

    /// Merges an open pull request. `merged_by` becomes the author of the
    /// resulting records.
    pub fn merge_pull_request(
        &mut self,
        request: PullRequestMergeRequest,
    ) -> Result<Edited<PullRequest, PullRequestChange>, StoreError> {
        let edited = self.write(|ctx| {
            let current: PullRequest = require_by_id_tx(ctx.tx(), request.pull_request_id)?;
            let Patched { entity, changes } = current.merge(request.merged_by.trim())?;
            update_pull_request_tx(ctx, &entity)?;
            let records =
                audit_tx::<PullRequestChange>(ctx, entity.id, &request.merged_by, &changes)?;
            Ok(Edited {
                entity,
                changes: records,
            })
        })?;
        tracing::info!(
            pull_request_id = edited.entity.id,
            merged_by = edited.entity.merged_by.as_deref().unwrap_or_default(),
            "pull request merged"
        );
        Ok(edited)
    }
}

fn require_author(author: &str) -> Result<(), StoreError> {
    if author.trim().is_empty() {
        return Err(ValidationError::blank("author").into());
    }
    Ok(())
}

fn unchanged<T, C>(entity: T) -> Edited<T, C> {
    Edited {
        entity,
        changes: Vec::new(),
    }
}

/// Runs after the entity row is written, so a failure here must undo it.
fn audit_tx<C: tl_core::ChangeFamily>(
    ctx: &TxContext<'_>,
    subject_id: i64,
    author: &str,
    changes: &FieldChanges,
) -> Result<Vec<ChangeRecord<C>>, StoreError> {
    ctx.failpoint(AFTER_ENTITY_UPDATE)?;
    record_changes_tx::<C>(ctx, subject_id, author, changes)
}

fn update_task_tx(ctx: &TxContext<'_>, task: &Task) -> Result<(), StoreError> {
    ctx.tx().execute(
        "UPDATE tasks SET sprint_id=?2, name=?3, description=?4, status=?5, priority=?6, \
         assignee=?7, due_date=?8, updated_at_ms=?9 WHERE id=?1",
        params![
            task.id,
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
    Ok(())
}

fn update_sprint_tx(ctx: &TxContext<'_>, sprint: &Sprint) -> Result<(), StoreError> {
    ctx.tx().execute(
        "UPDATE sprints SET name=?2, goal=?3, status=?4, start_date=?5, end_date=?6, \
         updated_at_ms=?7 WHERE id=?1",
        params![
            sprint.id,
            sprint.name,
            sprint.goal,
            sprint.status.as_str(),
            date_to_sql(sprint.start_date),
            date_to_sql(sprint.end_date),
            ctx.now_ms(),
        ],
    )?;
    Ok(())
}

fn update_pull_request_tx(ctx: &TxContext<'_>, pull_request: &PullRequest) -> Result<(), StoreError> {
    ctx.tx().execute(
        "UPDATE pull_requests SET title=?2, url=?3, status=?4, merged=?5, merged_by=?6, \
         updated_at_ms=?7 WHERE id=?1",
        params![
            pull_request.id,
            pull_request.title,
            pull_request.url,
            pull_request.status.as_str(),
            pull_request.merged,
            pull_request.merged_by,
            ctx.now_ms(),
        ],
    )?;
    Ok(())
}
