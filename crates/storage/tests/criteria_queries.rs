#![forbid(unsafe_code)]

use rusqlite::{Connection, params};
use tempfile::TempDir;
use tl_core::model::{PullRequestStatus, Sprint, Task, TaskPriority, TaskStatus, parse_date};
use tl_core::patch::PullRequestPatch;
use tl_core::{
    ChangeRecord, Criteria, EntityType, Operator, Patch, PullRequestChange, QueryError,
    TaskChange, TypedCriteria, Value,
};
use tl_storage::{
    PageRequest, ProjectCreateRequest, PullRequestCreateRequest, PullRequestMergeRequest,
    PullRequestPatchRequest, SortKey, SqliteStore, StoreError, TaskCreateRequest,
    UserCreateRequest,
};

fn open_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn create_user(store: &mut SqliteStore, id: &str) {
    store
        .create_user(UserCreateRequest {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            email: Some(format!("{id}@example.com")),
        })
        .expect("create user");
}

fn create_project(store: &mut SqliteStore, key: &str) -> i64 {
    store
        .create_project(ProjectCreateRequest {
            key: key.to_string(),
            name: format!("Project {key}"),
            description: None,
        })
        .expect("create project")
        .id
}

fn task_request(project_id: i64, name: &str) -> TaskCreateRequest {
    TaskCreateRequest {
        project_id,
        sprint_id: None,
        name: name.to_string(),
        description: None,
        status: TaskStatus::Open,
        priority: TaskPriority::Medium,
        assignee: None,
        due_date: None,
    }
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    items.iter().map(id).collect()
}

fn all_tasks() -> PageRequest {
    PageRequest::first(100)
}

fn by_id() -> Vec<SortKey> {
    vec![SortKey::asc("id").expect("sort key")]
}

#[test]
fn null_equality_matches_unassigned_only() {
    let (_dir, mut store) = open_store();
    create_user(&mut store, "alice");
    create_user(&mut store, "bob");
    let project_id = create_project(&mut store, "CORE");

    let mut assigned = task_request(project_id, "Assigned to alice");
    assigned.assignee = Some("alice".to_string());
    let assigned = store.create_task(assigned).expect("create task");
    let unassigned = store
        .create_task(task_request(project_id, "Nobody"))
        .expect("create task");
    let mut other = task_request(project_id, "Assigned to bob");
    other.assignee = Some("bob".to_string());
    let other = store.create_task(other).expect("create task");

    let none = store
        .find::<Task>(
            &Criteria::eq("assignee", Value::Null).expect("criteria"),
            all_tasks(),
            &by_id(),
        )
        .expect("find");
    assert_eq!(ids(&none.items, |task| task.id), vec![unassigned.id]);
    assert_eq!(none.total, 1);

    let some = store
        .find::<Task>(
            &Criteria::ne("assignee", Value::Null).expect("criteria"),
            all_tasks(),
            &by_id(),
        )
        .expect("find");
    assert_eq!(ids(&some.items, |task| task.id), vec![assigned.id, other.id]);

    // Rows with no assignee never satisfy `<>`.
    let not_alice = store
        .find::<Task>(
            &Criteria::ne("assignee", "alice").expect("criteria"),
            all_tasks(),
            &by_id(),
        )
        .expect("find");
    assert_eq!(ids(&not_alice.items, |task| task.id), vec![other.id]);

    let by_email = store
        .find::<Task>(
            &Criteria::ends_with("assignee.email", "bob@example.com").expect("criteria"),
            all_tasks(),
            &by_id(),
        )
        .expect("find");
    assert_eq!(ids(&by_email.items, |task| task.id), vec![other.id]);
}

#[test]
fn pull_request_changes_filter_by_task_project() {
    let (dir, mut store) = open_store();
    let raw = Connection::open(dir.path().join("tracklog.db")).expect("open raw db");
    raw.execute(
        "INSERT INTO projects(id, key, name, description, created_at_ms) VALUES (?1, ?2, ?3, NULL, 0)",
        params![42_i64, "P42", "Answer"],
    )
    .expect("insert project 42");
    let other_project = create_project(&mut store, "OTHER");

    let mut pull_requests = Vec::new();
    for (project_id, name) in [(42, "In 42 a"), (other_project, "Elsewhere"), (42, "In 42 b")] {
        let task = store
            .create_task(task_request(project_id, name))
            .expect("create task");
        let pull_request = store
            .create_pull_request(PullRequestCreateRequest {
                task_id: task.id,
                title: format!("PR for {name}"),
                url: None,
                status: PullRequestStatus::Open,
            })
            .expect("create pull request");
        store
            .patch_pull_request(PullRequestPatchRequest {
                pull_request_id: pull_request.id,
                author: "alice".to_string(),
                patch: PullRequestPatch {
                    title: Patch::Value(format!("Reviewed: {name}")),
                    ..PullRequestPatch::default()
                },
            })
            .expect("patch pull request");
        pull_requests.push((project_id, pull_request.id));
    }
    store
        .merge_pull_request(PullRequestMergeRequest {
            pull_request_id: pull_requests[2].1,
            merged_by: "ci-bot".to_string(),
        })
        .expect("merge");

    let criteria = TypedCriteria::new(
        EntityType::PullRequestChange,
        Criteria::eq("task.project.id", 42).expect("criteria"),
    )
    .expect("typed criteria");
    let page = store
        .find_typed::<ChangeRecord<PullRequestChange>>(&criteria, all_tasks(), &by_id())
        .expect("find");

    let in_42: Vec<i64> = pull_requests
        .iter()
        .filter(|(project_id, _)| *project_id == 42)
        .map(|(_, id)| *id)
        .collect();
    // One title change per pull request in 42, plus status and merge records.
    assert_eq!(page.items.len(), 4);
    assert!(
        page.items
            .iter()
            .all(|record| in_42.contains(&record.subject_id()))
    );

    let merged = store
        .find::<ChangeRecord<PullRequestChange>>(
            &Criteria::eq("merged", true)
                .expect("criteria")
                .and(Criteria::eq("pull_request.task.project.id", 42).expect("criteria")),
            all_tasks(),
            &by_id(),
        )
        .expect("find merged");
    assert_eq!(merged.items.len(), 1);
    assert_eq!(merged.items[0].kind(), "pr_merged");
    assert_eq!(merged.items[0].author(), "ci-bot");
}

#[test]
fn comparison_and_pattern_operators() {
    let (_dir, mut store) = open_store();
    let project_id = create_project(&mut store, "CORE");
    let mut early = task_request(project_id, "Fix login bug");
    early.due_date = parse_date("2024-03-01");
    let early = store.create_task(early).expect("create task");
    let mut late = task_request(project_id, "Write docs");
    late.due_date = parse_date("2024-11-15");
    late.priority = TaskPriority::High;
    let late = store.create_task(late).expect("create task");
    let undated = store
        .create_task(task_request(project_id, "Fix_underscore"))
        .expect("create task");

    let find = |criteria: Criteria| -> Vec<i64> {
        let page = store
            .find::<Task>(&criteria, all_tasks(), &by_id())
            .expect("find");
        ids(&page.items, |task| task.id)
    };

    assert_eq!(
        find(Criteria::starts_with("name", "Fix").expect("criteria")),
        vec![early.id, undated.id]
    );
    assert_eq!(
        find(Criteria::contains("name", "_").expect("criteria")),
        vec![undated.id]
    );
    assert_eq!(find(Criteria::like("name", "%bug").expect("criteria")), vec![early.id]);
    assert_eq!(
        find(Criteria::ends_with("name", "docs").expect("criteria")),
        vec![late.id]
    );
    assert_eq!(
        find(Criteria::gt("due_date", "2024-06-01").expect("criteria")),
        vec![late.id]
    );
    assert_eq!(
        find(Criteria::lt("due_date", "2024-06-01").expect("criteria")),
        vec![early.id]
    );
    assert_eq!(
        find(Criteria::eq("due_date", "2024-03-01").expect("criteria")),
        vec![early.id]
    );
    assert_eq!(
        find(Criteria::eq("project.key", "CORE").expect("criteria")),
        vec![early.id, late.id, undated.id]
    );
    assert_eq!(
        find(Criteria::any([
            Criteria::eq("priority", "high").expect("criteria"),
            Criteria::eq("due_date", Value::Null).expect("criteria"),
        ])),
        vec![late.id, undated.id]
    );
    assert_eq!(find(Criteria::any(Vec::new())), Vec::<i64>::new());
    assert_eq!(find(Criteria::none()).len(), 3);
}

#[test]
fn invalid_criteria_fail_with_query_errors() {
    let (_dir, store) = open_store();

    let err = store
        .find::<Task>(
            &Criteria::eq("owner", "alice").expect("criteria"),
            all_tasks(),
            &by_id(),
        )
        .expect_err("unknown field");
    assert!(matches!(
        err,
        StoreError::Query(QueryError::UnknownField { entity: "task", .. })
    ));

    let err = store
        .count::<Task>(&Criteria::eq("id", "seven").expect("criteria"))
        .expect_err("type mismatch");
    assert!(matches!(err, StoreError::Query(QueryError::TypeMismatch { .. })));

    let err = store
        .count::<Task>(&Criteria::condition("name", Operator::Contains, 5).expect("criteria"))
        .expect_err("pattern needs text");
    assert!(matches!(err, StoreError::Query(QueryError::TypeMismatch { .. })));

    let err = store
        .count::<Task>(&Criteria::gt("due_date", Value::Null).expect("criteria"))
        .expect_err("null ordering");
    assert!(matches!(err, StoreError::Query(QueryError::NullNotAllowed { .. })));

    // Valid for tasks, not for change records.
    let err = store
        .count::<ChangeRecord<TaskChange>>(&Criteria::eq("sprint.name", "S1").expect("criteria"))
        .expect_err("wrong root");
    assert!(matches!(err, StoreError::Query(QueryError::UnknownField { .. })));

    let err = store
        .count::<Task>(&Criteria::eq("name.length", 3).expect("criteria"))
        .expect_err("scalar traversal");
    assert!(matches!(err, StoreError::Query(QueryError::NotARelation { .. })));
}

#[test]
fn paging_with_unique_sort_key_is_stable() {
    let (_dir, mut store) = open_store();
    let project_id = create_project(&mut store, "CORE");
    let mut created = Vec::new();
    for index in 0..7 {
        let mut request = task_request(project_id, &format!("Task {index}"));
        request.priority = if index % 2 == 0 {
            TaskPriority::High
        } else {
            TaskPriority::Low
        };
        created.push(store.create_task(request).expect("create task").id);
    }

    let sort = vec![
        SortKey::asc("priority").expect("sort key"),
        SortKey::desc("id").expect("sort key"),
    ];
    let mut seen = Vec::new();
    for page in 0..3 {
        let first = store
            .find::<Task>(&Criteria::none(), PageRequest::new(page, 3), &sort)
            .expect("find");
        let second = store
            .find::<Task>(&Criteria::none(), PageRequest::new(page, 3), &sort)
            .expect("find again");
        assert_eq!(first, second);
        assert_eq!(first.total, 7);
        seen.extend(ids(&first.items, |task| task.id));
    }
    assert_eq!(seen.len(), 7);

    // "high" sorts before "low"; ids descend inside each priority.
    let expected: Vec<i64> = [6, 4, 2, 0, 5, 3, 1]
        .iter()
        .map(|index| created[*index])
        .collect();
    assert_eq!(seen, expected);

    assert_eq!(store.count::<Task>(&Criteria::none()).expect("count"), 7);
    let defaulted = store
        .find_page::<Task>(&Criteria::none(), 0, &sort)
        .expect("default page");
    assert_eq!(defaulted.size, store.config().default_page_size);
    assert_eq!(defaulted.items.len(), 7);
}

#[test]
fn page_requests_are_bounded() {
    let (_dir, store) = open_store();
    let err = store
        .find::<Task>(&Criteria::none(), PageRequest::new(0, 0), &by_id())
        .expect_err("zero size");
    assert!(matches!(err, StoreError::Query(QueryError::InvalidPage(_))));

    let too_big = store.config().max_page_size + 1;
    let err = store
        .find::<Task>(&Criteria::none(), PageRequest::new(0, too_big), &by_id())
        .expect_err("oversized page");
    assert!(matches!(err, StoreError::Query(QueryError::InvalidPage(_))));
}

#[test]
fn typed_criteria_only_query_the_entity_they_were_checked_against() {
    let (_dir, mut store) = open_store();
    let project_id = create_project(&mut store, "TYPE");
    store
        .create_task(task_request(project_id, "Open work"))
        .expect("create task");

    // `status` exists on both tasks and sprints, so the tree itself would
    // translate against either table.
    let criteria = TypedCriteria::new(
        EntityType::Task,
        Criteria::eq("status", "open").expect("criteria"),
    )
    .expect("typed criteria");

    let err = store
        .find_typed::<Sprint>(&criteria, all_tasks(), &by_id())
        .expect_err("task criteria against sprints");
    match err {
        StoreError::Query(QueryError::EntityMismatch { typed, requested }) => {
            assert_eq!(typed, "task");
            assert_eq!(requested, "sprint");
        }
        other => panic!("expected EntityMismatch, got {other:?}"),
    }
    assert!(matches!(
        store.count_typed::<Sprint>(&criteria),
        Err(StoreError::Query(QueryError::EntityMismatch { .. }))
    ));

    let page = store
        .find_typed::<Task>(&criteria, all_tasks(), &by_id())
        .expect("find tasks");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 1);
    assert_eq!(store.count_typed::<Task>(&criteria).expect("count"), 1);
}

#[test]
fn whitespace_in_a_path_is_rejected_before_querying() {
    let err = Criteria::eq(" project . key ", "CORE").expect_err("padded path");
    assert!(matches!(err, QueryError::WhitespaceInPath { .. }));
    assert!(SortKey::asc("id ").is_err());
}
