#![forbid(unsafe_code)]

// Change tables reference their subject by id only: history outlives the row.
pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS task_changes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject_id INTEGER NOT NULL,
          author TEXT NOT NULL,
          occurred_at_ms INTEGER NOT NULL,
          kind TEXT NOT NULL,
          old_value TEXT,
          new_value TEXT
        );

        CREATE TABLE IF NOT EXISTS sprint_changes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject_id INTEGER NOT NULL,
          author TEXT NOT NULL,
          occurred_at_ms INTEGER NOT NULL,
          kind TEXT NOT NULL,
          old_value TEXT,
          new_value TEXT
        );

        CREATE TABLE IF NOT EXISTS pull_request_changes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          subject_id INTEGER NOT NULL,
          author TEXT NOT NULL,
          occurred_at_ms INTEGER NOT NULL,
          kind TEXT NOT NULL,
          old_value TEXT,
          new_value TEXT,
          merged INTEGER,
          merged_by TEXT
        );
"#;
