use super::*;
use time::macros::date;

fn task() -> Task {
    Task {
        id: 7,
        project_id: 1,
        sprint_id: None,
        name: "Old name".to_string(),
        description: Some("details".to_string()),
        status: TaskStatus::Open,
        priority: TaskPriority::Medium,
        assignee: Some("alice".to_string()),
        due_date: None,
    }
}

#[test]
fn scenario_rename_and_unassign_leaves_status_alone() {
    let patch = TaskPatch {
        name: Patch::Value("Fix bug".to_string()),
        assignee: Patch::Null,
        ..TaskPatch::default()
    };

    let Patched { entity, changes } = task().apply_patch(&patch).expect("patch");

    assert_eq!(entity.name, "Fix bug");
    assert_eq!(entity.assignee, None);
    assert_eq!(entity.status, TaskStatus::Open);
    assert_eq!(changes.len(), 2);

    let name = changes.get("name").expect("name change");
    assert_eq!(name.old.as_deref(), Some("Old name"));
    assert_eq!(name.new.as_deref(), Some("Fix bug"));

    let assignee = changes.get("assignee").expect("assignee change");
    assert_eq!(assignee.old.as_deref(), Some("alice"));
    assert_eq!(assignee.new, None);
}

#[test]
fn values_equal_to_current_emit_nothing() {
    let current = task();
    let patch = TaskPatch {
        name: Patch::Value(current.name.clone()),
        description: Patch::Value("details".to_string()),
        status: Patch::Value(TaskStatus::Open),
        priority: Patch::Value(TaskPriority::Medium),
        assignee: Patch::Value("alice".to_string()),
        due_date: Patch::Null,
        sprint: Patch::Null,
    };

    let patched = current.apply_patch(&patch).expect("patch");

    assert!(patched.changes.is_empty());
    assert_eq!(patched.entity, current);
}

#[test]
fn empty_patch_is_a_no_op() {
    let current = task();
    let patched = current.apply_patch(&TaskPatch::default()).expect("patch");
    assert!(patched.changes.is_empty());
    assert_eq!(patched.entity, current);
}

#[test]
fn null_on_required_field_is_rejected() {
    let patch = TaskPatch {
        name: Patch::Null,
        ..TaskPatch::default()
    };
    let err = task().apply_patch(&patch).expect_err("name is required");
    assert_eq!(err, ValidationError::not_nullable("name"));

    let patch = TaskPatch {
        status: Patch::Null,
        ..TaskPatch::default()
    };
    let err = task().apply_patch(&patch).expect_err("status is required");
    assert_eq!(err.field, "status");
}

#[test]
fn overlong_name_is_rejected() {
    let patch = TaskPatch {
        name: Patch::Value("x".repeat(256)),
        ..TaskPatch::default()
    };
    let err = task().apply_patch(&patch).expect_err("too long");
    assert_eq!(err, ValidationError::too_long("name", 255));
}

#[test]
fn setting_a_date_renders_iso() {
    let patch = TaskPatch {
        due_date: Patch::Value(date!(2024 - 06 - 30)),
        sprint: Patch::Value(3),
        ..TaskPatch::default()
    };
    let patched = task().apply_patch(&patch).expect("patch");
    let due = patched.changes.get("due_date").expect("due date change");
    assert_eq!(due.old, None);
    assert_eq!(due.new.as_deref(), Some("2024-06-30"));
    let sprint = patched.changes.get("sprint").expect("sprint change");
    assert_eq!(sprint.new.as_deref(), Some("3"));
    assert_eq!(patched.entity.sprint_id, Some(3));
}

#[test]
fn json_distinguishes_absent_null_and_value() {
    let patch: TaskPatch =
        serde_json::from_str(r#"{"name":"Fix bug","assignee":null}"#).expect("decode patch");
    assert_eq!(patch.name, Patch::Value("Fix bug".to_string()));
    assert_eq!(patch.assignee, Patch::Null);
    assert_eq!(patch.status, Patch::Absent);
    assert_eq!(patch.description, Patch::Absent);

    let patch: TaskPatch =
        serde_json::from_str(r#"{"status":"in_progress","sprint":4}"#).expect("decode patch");
    assert_eq!(patch.status, Patch::Value(TaskStatus::InProgress));
    assert_eq!(patch.sprint, Patch::Value(4));

    assert!(serde_json::from_str::<TaskPatch>(r#"{"title":"x"}"#).is_err());
}

#[test]
fn sprint_dates_are_validated_after_resolution() {
    let sprint = Sprint {
        id: 1,
        project_id: 1,
        name: "Sprint 1".to_string(),
        goal: None,
        status: SprintStatus::Planned,
        start_date: Some(date!(2024 - 05 - 01)),
        end_date: Some(date!(2024 - 05 - 14)),
    };
    let patch = SprintPatch {
        start_date: Patch::Value(date!(2024 - 05 - 20)),
        ..SprintPatch::default()
    };
    let err = sprint.apply_patch(&patch).expect_err("start after end");
    assert_eq!(err.field, "end_date");

    let patch = SprintPatch {
        start_date: Patch::Value(date!(2024 - 05 - 20)),
        end_date: Patch::Null,
        goal: Patch::Value("Ship it".to_string()),
        ..SprintPatch::default()
    };
    let patched = sprint.apply_patch(&patch).expect("patch");
    assert_eq!(patched.changes.len(), 3);
    assert_eq!(patched.entity.end_date, None);
}

#[test]
fn sprint_patch_with_every_current_value_emits_nothing() {
    let sprint = Sprint {
        id: 2,
        project_id: 1,
        name: "Sprint 2".to_string(),
        goal: Some("Stabilise".to_string()),
        status: SprintStatus::Active,
        start_date: Some(date!(2024 - 06 - 01)),
        end_date: None,
    };
    let patch = SprintPatch {
        name: Patch::Value("Sprint 2".to_string()),
        goal: Patch::Value("Stabilise".to_string()),
        status: Patch::Value(SprintStatus::Active),
        start_date: Patch::Value(date!(2024 - 06 - 01)),
        end_date: Patch::Null,
    };
    let patched = sprint.apply_patch(&patch).expect("patch");
    assert!(patched.changes.is_empty());
    assert_eq!(patched.entity, sprint);
}

fn pull_request() -> PullRequest {
    PullRequest {
        id: 11,
        task_id: 7,
        title: "Fix login".to_string(),
        url: None,
        status: PullRequestStatus::Open,
        merged: false,
        merged_by: None,
    }
}

#[test]
fn merge_emits_status_and_merged_fields() {
    let patched = pull_request().merge("ci-bot").expect("merge");
    assert!(patched.entity.merged);
    assert_eq!(patched.entity.status, PullRequestStatus::Merged);
    assert_eq!(patched.entity.merged_by.as_deref(), Some("ci-bot"));
    assert_eq!(
        patched
            .changes
            .iter()
            .map(|change| change.field.as_str())
            .collect::<Vec<_>>(),
        vec!["status", "merged"]
    );

    let err = patched.entity.merge("ci-bot").expect_err("double merge");
    assert_eq!(err.field, "merged");
}

#[test]
fn merged_status_is_not_patchable() {
    let patch = PullRequestPatch {
        status: Patch::Value(PullRequestStatus::Merged),
        ..PullRequestPatch::default()
    };
    assert!(pull_request().apply_patch(&patch).is_err());

    let merged = pull_request().merge("alice").expect("merge").entity;
    let patch = PullRequestPatch {
        title: Patch::Value("Renamed".to_string()),
        ..PullRequestPatch::default()
    };
    assert!(merged.apply_patch(&patch).is_err());

    let patch = PullRequestPatch {
        url: Patch::Value("https://example.test/pr/11".to_string()),
        ..PullRequestPatch::default()
    };
    let patched = merged.apply_patch(&patch).expect("url stays editable");
    assert_eq!(patched.changes.len(), 1);
}

#[test]
fn pull_request_patch_with_every_current_value_emits_nothing() {
    let open = PullRequest {
        url: Some("https://example.test/pr/11".to_string()),
        ..pull_request()
    };
    let same = PullRequestPatch {
        title: Patch::Value("Fix login".to_string()),
        url: Patch::Value("https://example.test/pr/11".to_string()),
        status: Patch::Value(PullRequestStatus::Open),
    };
    let patched = open.apply_patch(&same).expect("patch");
    assert!(patched.changes.is_empty());
    assert_eq!(patched.entity, open);

    // Frozen fields restated at their current value are not edits.
    let merged = open.merge("ci-bot").expect("merge").entity;
    let same = PullRequestPatch {
        status: Patch::Value(PullRequestStatus::Merged),
        ..same
    };
    let patched = merged.apply_patch(&same).expect("no-op on merged");
    assert!(patched.changes.is_empty());
    assert_eq!(patched.entity, merged);
}

#[test]
fn field_changes_drop_equal_pairs() {
    let mut changes = FieldChanges::new();
    changes.push("name", Some("a".to_string()), Some("a".to_string()));
    changes.push("goal", None, None);
    assert!(changes.is_empty());
    changes.push("name", Some("a".to_string()), Some("b".to_string()));
    assert_eq!(changes.len(), 1);
}
