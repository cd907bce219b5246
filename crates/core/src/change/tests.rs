use super::*;

#[test]
fn unknown_fields_have_no_variant() {
    assert_eq!(
        TaskChange::from_field("estimate", Some("1"), Some("2"), "alice"),
        None
    );
    assert_eq!(
        SprintChange::from_field("assignee", None, Some("bob"), "alice"),
        None
    );
}

#[test]
fn discriminators_are_scoped_per_family() {
    let task = TaskChange::from_field("status", Some("open"), Some("done"), "alice")
        .expect("task status");
    let sprint = SprintChange::from_field("status", Some("planned"), Some("active"), "alice")
        .expect("sprint status");
    assert_eq!(task.kind(), "status_change");
    assert_eq!(sprint.kind(), "status_change");
    assert_ne!(TaskChange::TABLE, SprintChange::TABLE);

    let err = TaskChange::from_columns("goal_change", ChangeColumns::default())
        .expect_err("goal is a sprint kind");
    assert_eq!(
        err,
        ChangeDecodeError::UnknownKind {
            family: "task",
            kind: "goal_change".to_string(),
        }
    );
}

#[test]
fn merged_variant_carries_actor_instead_of_values() {
    let change = PullRequestChange::from_field("merged", Some("false"), Some("true"), "webhook")
        .expect("merged");
    assert_eq!(
        change,
        PullRequestChange::Merged {
            merged: true,
            merged_by: "webhook".to_string(),
        }
    );
    let columns = change.to_columns();
    assert_eq!(columns.old_value, None);
    assert_eq!(columns.merged, Some(true));

    let decoded = PullRequestChange::from_columns("pr_merged", columns).expect("decode");
    assert_eq!(decoded, change);

    let err = PullRequestChange::from_columns("pr_merged", ChangeColumns::default())
        .expect_err("payload missing");
    assert!(matches!(
        err,
        ChangeDecodeError::MissingColumn {
            column: "merged",
            ..
        }
    ));
}

#[test]
fn replay_keeps_last_value_per_field() {
    let history = vec![
        ChangeRecord::new(
            1,
            9,
            "alice".to_string(),
            100,
            TaskChange::Name(ValueChange::new(Some("a"), Some("b"))),
        ),
        ChangeRecord::new(
            2,
            9,
            "bob".to_string(),
            100,
            TaskChange::Assignee(ValueChange::new(None, Some("bob"))),
        ),
        ChangeRecord::new(
            3,
            9,
            "bob".to_string(),
            200,
            TaskChange::Name(ValueChange::new(Some("b"), Some("c"))),
        ),
        ChangeRecord::new(
            4,
            9,
            "bob".to_string(),
            300,
            TaskChange::Assignee(ValueChange::new(Some("bob"), None)),
        ),
    ];
    let state = replay(&history);
    assert_eq!(state.get("name"), Some(&Some("c".to_string())));
    assert_eq!(state.get("assignee"), Some(&None));
    assert_eq!(state.get("status"), None);
}
