#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_sprints_project ON sprints(project_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_sprint ON tasks(sprint_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee);
        CREATE INDEX IF NOT EXISTS idx_pull_requests_task ON pull_requests(task_id);
        CREATE INDEX IF NOT EXISTS idx_task_changes_subject ON task_changes(subject_id, occurred_at_ms, id);
        CREATE INDEX IF NOT EXISTS idx_sprint_changes_subject ON sprint_changes(subject_id, occurred_at_ms, id);
        CREATE INDEX IF NOT EXISTS idx_pull_request_changes_subject ON pull_request_changes(subject_id, occurred_at_ms, id);
"#;
