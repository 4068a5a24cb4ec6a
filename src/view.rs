//! Derived task lists: filter, sort and group.
//!
//! [`derive_view`] runs the stages in a fixed order:
//! status filter, project filter, text search, stable sort, grouping.
//! Every stage is a pure function over borrowed tasks and is public so the
//! CLI and the TUI can reuse pieces on their own.

use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::fields::*;
use crate::task::Task;

/// Inputs of the view pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub status: StatusFilter,
    pub search: String,
    /// `None` shows every project.
    pub project_id: Option<String>,
    pub sort: SortKey,
    pub group: GroupKey,
}

/// Identity of a group in the derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupId {
    All,
    Priority(Priority),
    Status(Status),
}

impl GroupId {
    pub fn label(self) -> &'static str {
        match self {
            GroupId::All => "All Tasks",
            GroupId::Priority(p) => p.label(),
            GroupId::Status(s) => s.label(),
        }
    }
}

/// A labelled run of tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup<'a> {
    pub id: GroupId,
    pub tasks: Vec<&'a Task>,
}

impl TaskGroup<'_> {
    pub fn label(&self) -> &'static str {
        self.id.label()
    }
}

/// Run the full pipeline over `tasks` (in store order).
pub fn derive_view<'a>(tasks: &'a [Task], opts: &ViewOptions) -> Vec<TaskGroup<'a>> {
    let mut visible = filter_tasks(tasks, opts.status, opts.project_id.as_deref(), &opts.search);
    sort_tasks(&mut visible, opts.sort);
    group_tasks(visible, opts.group)
}

/// Stages 1 to 3: status, project membership, then case-insensitive text.
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    status: StatusFilter,
    project_id: Option<&str>,
    search: &str,
) -> Vec<&'a Task> {
    let needle = search.to_lowercase();
    tasks
        .iter()
        .filter(|t| status.matches(t.status))
        .filter(|t| project_id.map_or(true, |pid| t.project_id.as_deref() == Some(pid)))
        .filter(|t| t.matches_text(&needle))
        .collect()
}

/// Stage 4. All keys sort stably, so equal keys keep their incoming order.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::Manual => {}
        SortKey::Priority => tasks.sort_by_key(|t| Reverse(t.priority.rank())),
        SortKey::DueDate => tasks.sort_by_key(|t| t.due_date.unwrap_or(NaiveDate::MAX)),
        SortKey::Status => tasks.sort_by_key(|t| t.status.rank()),
    }
}

/// Stage 5. Buckets appear in the order their first task appears.
pub fn group_tasks(tasks: Vec<&Task>, key: GroupKey) -> Vec<TaskGroup<'_>> {
    if key == GroupKey::None {
        return vec![TaskGroup { id: GroupId::All, tasks }];
    }
    let bucket = |t: &Task| match key {
        GroupKey::Priority => GroupId::Priority(t.priority),
        GroupKey::Status => GroupId::Status(t.status),
        GroupKey::None => GroupId::All,
    };

    let mut groups: Vec<TaskGroup<'_>> = Vec::new();
    for task in tasks {
        let id = bucket(task);
        match groups.iter_mut().find(|g| g.id == id) {
            Some(group) => group.tasks.push(task),
            None => groups.push(TaskGroup { id, tasks: vec![task] }),
        }
    }
    groups
}
