use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use chrono::NaiveDate;
use taskflow::fields::{Priority, Status};
use taskflow::project::ProjectDraft;
use taskflow::storage::{FileStorage, StoreKeys};
use taskflow::store::{Collection, Store, StoreEvent};
use taskflow::task::{TaskDraft, TaskPatch};
use taskflow::Error;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Store<FileStorage> {
    Store::open(FileStorage::new(dir.path()), StoreKeys::default())
}

#[test]
fn changes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let (task_id, project_id) = {
        let mut store = open(&dir);
        let project = store.create_project(ProjectDraft::new("Work")).unwrap();
        let draft = TaskDraft {
            priority: Priority::Urgent,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            project_id: Some(project.id.clone()),
            ..TaskDraft::new("Quarterly report")
        };
        let task = store.create_task(draft).unwrap();
        store.toggle_task_status(&task.id).unwrap();
        assert!(store.unsaved().is_empty());
        (task.id, project.id)
    };

    let store = open(&dir);
    let task = store.task(&task_id).unwrap();
    assert_eq!(task.title, "Quarterly report");
    assert_eq!(task.priority, Priority::Urgent);
    assert_eq!(task.status, Status::Completed);
    assert_eq!(task.project_id.as_deref(), Some(project_id.as_str()));
    assert_eq!(store.project(&project_id).unwrap().name, "Work");
}

#[test]
fn record_layout_uses_camel_case_keys() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let draft = TaskDraft { due_date: NaiveDate::from_ymd_opt(2024, 1, 2), ..TaskDraft::new("a") };
    store.create_task(draft).unwrap();

    let raw = fs::read_to_string(dir.path().join("tasks.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &value[0];
    assert_eq!(record["dueDate"], "2024-01-02");
    assert_eq!(record["status"], "pending");
    assert!(record.get("createdAt").is_some());
    assert!(!dir.path().join("projects.json").exists());
}

#[test]
fn custom_keys_select_files() {
    let dir = TempDir::new().unwrap();
    let keys = StoreKeys { tasks: "Team Tasks".to_string(), projects: "team-projects".to_string() };
    let mut store = Store::open(FileStorage::new(dir.path()), keys.clone());
    store.create_project(ProjectDraft::new("Ops")).unwrap();
    store.create_task(TaskDraft::new("Rotate keys")).unwrap();

    assert!(dir.path().join("team_tasks.json").exists());
    assert!(dir.path().join("team_projects.json").exists());

    let other = open(&dir);
    assert!(other.tasks().is_empty());
    let same = Store::open(FileStorage::new(dir.path()), keys);
    assert_eq!(same.tasks().len(), 1);
}

#[test]
fn corrupt_record_degrades_to_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tasks.json"), "{ not json").unwrap();
    fs::write(
        dir.path().join("projects.json"),
        r##"[{"id":"p1","name":"Home","color":"#10b981","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}]"##,
    )
    .unwrap();

    let mut store = open(&dir);
    assert!(store.tasks().is_empty());
    assert_eq!(store.projects().len(), 1);

    // The next write replaces the corrupt record.
    store.create_task(TaskDraft { project_id: Some("p1".into()), ..TaskDraft::new("fix") }).unwrap();
    let reopened = open(&dir);
    assert_eq!(reopened.tasks().len(), 1);
}

#[test]
fn lenient_due_dates_load_as_none() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tasks.json"),
        r#"[
            {"id":"t1","title":"keep","dueDate":"2024-03-04T10:00:00.000Z","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"},
            {"id":"t2","title":"drop","dueDate":"someday","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}
        ]"#,
    )
    .unwrap();

    let store = open(&dir);
    assert_eq!(store.tasks().len(), 2);
    assert_eq!(store.task("t1").unwrap().due_date, NaiveDate::from_ymd_opt(2024, 3, 4));
    assert_eq!(store.task("t2").unwrap().due_date, None);
    assert_eq!(store.task("t2").unwrap().priority, Priority::Medium);
}

#[test]
fn reload_picks_up_external_writes() {
    let dir = TempDir::new().unwrap();
    let mut first = open(&dir);
    let mut second = open(&dir);
    second.create_task(TaskDraft::new("from elsewhere")).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    first.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    assert!(first.tasks().is_empty());
    first.reload();
    assert_eq!(first.tasks().len(), 1);
    assert_eq!(events.borrow().as_slice(), &[StoreEvent::Reloaded]);
}

#[test]
fn unwritable_directory_keeps_memory_state() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("data");
    fs::write(&blocker, "a file, not a directory").unwrap();

    let mut store = Store::open(FileStorage::new(&blocker), StoreKeys::default());
    let task = store.create_task(TaskDraft::new("volatile")).unwrap();
    assert_eq!(store.tasks().len(), 1);
    assert!(store.unsaved().contains(&Collection::Tasks));
    assert!(!store.unsaved().contains(&Collection::Projects));

    let patch = TaskPatch { title: Some("still here".into()), ..TaskPatch::default() };
    assert_eq!(store.update_task(&task.id, patch).unwrap().title, "still here");
}

#[test]
fn guarded_project_delete_leaves_files_untouched() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let work = store.create_project(ProjectDraft::new("Work")).unwrap();
    store.create_task(TaskDraft { project_id: Some(work.id.clone()), ..TaskDraft::new("t") }).unwrap();
    let before = fs::read_to_string(dir.path().join("projects.json")).unwrap();

    assert!(matches!(store.delete_project(&work.id), Err(Error::HasTasks { count: 1, .. })));
    assert_eq!(fs::read_to_string(dir.path().join("projects.json")).unwrap(), before);
}
