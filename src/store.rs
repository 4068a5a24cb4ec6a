//! The authoritative task and project collections.
//!
//! `Store` owns both collections, validates every mutation, writes the
//! affected collection through to [`Storage`] and then notifies subscribers.
//! Readers only ever see shared slices.
//!
//! Persistence is best effort in both directions:
//! - a record that cannot be read or decoded loads as an empty collection;
//! - a failed write leaves the in-memory state authoritative and marks the
//!   collection as unsaved until a later write succeeds.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result, StorageError};
use crate::fields::Status;
use crate::project::{is_valid_color, non_blank, Project, ProjectDraft, ProjectPatch};
use crate::storage::{MemoryStorage, Storage, StoreKeys};
use crate::task::{Task, TaskDraft, TaskPatch};

/// One of the two persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Tasks,
    Projects,
}

/// Change notification emitted after every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskCreated(String),
    TaskUpdated(String),
    TaskDeleted(String),
    TasksReordered { source: String, target: String },
    ProjectCreated(String),
    ProjectUpdated(String),
    ProjectDeleted(String),
    /// Both collections were re-read from storage.
    Reloaded,
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

pub struct Store<S: Storage> {
    storage: S,
    keys: StoreKeys,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    unsaved: BTreeSet<Collection>,
}

impl Store<MemoryStorage> {
    /// An empty store backed by [`MemoryStorage`] with the default keys.
    pub fn in_memory() -> Self {
        Store::open(MemoryStorage::new(), StoreKeys::default())
    }
}

impl<S: Storage> Store<S> {
    /// Load both collections from `storage`, degrading to empty collections
    /// when a record is missing, unreadable or corrupt.
    pub fn open(storage: S, keys: StoreKeys) -> Self {
        let tasks = load_collection(&storage, &keys.tasks);
        let projects = load_collection(&storage, &keys.projects);
        tracing::debug!(tasks = tasks.len(), projects = projects.len(), "store opened");
        Store {
            storage,
            keys,
            tasks,
            projects,
            listeners: Vec::new(),
            next_subscription: 0,
            unsaved: BTreeSet::new(),
        }
    }

    /// Re-read both collections from storage and notify subscribers.
    ///
    /// Unsaved in-memory changes are discarded; storage wins.
    pub fn reload(&mut self) {
        self.tasks = load_collection(&self.storage, &self.keys.tasks);
        self.projects = load_collection(&self.storage, &self.keys.projects);
        self.unsaved.clear();
        self.emit(StoreEvent::Reloaded);
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Tasks in manual (drag) order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Collections whose latest write to storage failed.
    pub fn unsaved(&self) -> &BTreeSet<Collection> {
        &self.unsaved
    }

    /// Register a callback invoked after every mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Create a task at the front of the list.
    pub fn create_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let title = required(&draft.title, "task title")?;
        if let Some(pid) = &draft.project_id {
            self.require_project(pid)?;
        }

        let now = Utc::now();
        let task = Task {
            id: self.fresh_id(),
            title,
            description: draft.description,
            priority: draft.priority,
            status: draft.status,
            due_date: draft.due_date,
            project_id: draft.project_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(0, task.clone());
        tracing::debug!(task_id = %task.id, "created task");
        self.persist(Collection::Tasks);
        self.emit(StoreEvent::TaskCreated(task.id.clone()));
        Ok(task)
    }

    /// Merge `patch` into an existing task.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let idx = self.task_index(id)?;
        let title = patch.title.as_deref().map(|t| required(t, "task title")).transpose()?;
        if let Some(Some(pid)) = &patch.project_id {
            self.require_project(pid)?;
        }

        let t = &mut self.tasks[idx];
        if let Some(title) = title {
            t.title = title;
        }
        if let Some(d) = patch.description {
            t.description = d;
        }
        if let Some(p) = patch.priority {
            t.priority = p;
        }
        if let Some(s) = patch.status {
            t.status = s;
        }
        if let Some(due) = patch.due_date {
            t.due_date = due;
        }
        if let Some(pid) = patch.project_id {
            t.project_id = pid;
        }
        t.updated_at = touch(t.created_at);
        let task = t.clone();

        tracing::debug!(task_id = %task.id, "updated task");
        self.persist(Collection::Tasks);
        self.emit(StoreEvent::TaskUpdated(task.id.clone()));
        Ok(task)
    }

    /// Remove a task. Deleting an absent id is a no-op returning false.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            return false;
        };
        self.tasks.remove(idx);
        tracing::debug!(task_id = id, "deleted task");
        self.persist(Collection::Tasks);
        self.emit(StoreEvent::TaskDeleted(id.to_string()));
        true
    }

    /// Flip a task between pending and completed; returns the new status.
    pub fn toggle_task_status(&mut self, id: &str) -> Result<Status> {
        let idx = self.task_index(id)?;
        let t = &mut self.tasks[idx];
        t.status = t.status.toggled();
        t.updated_at = touch(t.created_at);
        let status = t.status;

        tracing::debug!(task_id = id, ?status, "toggled task");
        self.persist(Collection::Tasks);
        self.emit(StoreEvent::TaskUpdated(id.to_string()));
        Ok(status)
    }

    /// Move the `source` task into the slot `target` occupies.
    ///
    /// Returns false, changing nothing, when either id is unknown or both
    /// name the same task.
    pub fn reorder_tasks(&mut self, source: &str, target: &str) -> bool {
        if source == target {
            return false;
        }
        let from = self.tasks.iter().position(|t| t.id == source);
        let to = self.tasks.iter().position(|t| t.id == target);
        let (Some(from), Some(to)) = (from, to) else {
            return false;
        };
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);

        tracing::debug!(source, target, from, to, "reordered tasks");
        self.persist(Collection::Tasks);
        self.emit(StoreEvent::TasksReordered {
            source: source.to_string(),
            target: target.to_string(),
        });
        true
    }

    /// Create a project at the end of the list.
    pub fn create_project(&mut self, draft: ProjectDraft) -> Result<Project> {
        let name = required(&draft.name, "project name")?;
        let color = checked_color(&draft.color)?;
        let parent_id = non_blank(draft.parent_id);
        let id = self.fresh_id();
        if let Some(pid) = &parent_id {
            self.check_parent(&id, pid)?;
        }

        let now = Utc::now();
        let project = Project {
            id,
            name,
            description: non_blank(draft.description),
            parent_id,
            color,
            created_at: now,
            updated_at: now,
        };
        self.projects.push(project.clone());
        tracing::debug!(project_id = %project.id, "created project");
        self.persist(Collection::Projects);
        self.emit(StoreEvent::ProjectCreated(project.id.clone()));
        Ok(project)
    }

    /// Merge `patch` into an existing project.
    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) -> Result<Project> {
        let idx = self.project_index(id)?;
        let name = patch.name.as_deref().map(|n| required(n, "project name")).transpose()?;
        let color = patch.color.as_deref().map(checked_color).transpose()?;
        let parent_id = patch.parent_id.map(non_blank);
        if let Some(Some(pid)) = &parent_id {
            self.check_parent(id, pid)?;
        }

        let p = &mut self.projects[idx];
        if let Some(name) = name {
            p.name = name;
        }
        if let Some(d) = patch.description {
            p.description = non_blank(d);
        }
        if let Some(parent) = parent_id {
            p.parent_id = parent;
        }
        if let Some(c) = color {
            p.color = c;
        }
        p.updated_at = touch(p.created_at);
        let project = p.clone();

        tracing::debug!(project_id = id, "updated project");
        self.persist(Collection::Projects);
        self.emit(StoreEvent::ProjectUpdated(id.to_string()));
        Ok(project)
    }

    /// Remove a project that has neither sub-projects nor tasks.
    ///
    /// Sub-projects are checked before tasks. An absent id is a no-op
    /// returning `Ok(false)`.
    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        let Some(idx) = self.projects.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let children = self.projects.iter().filter(|p| p.parent_id.as_deref() == Some(id)).count();
        if children > 0 {
            return Err(Error::HasChildren { id: id.to_string(), count: children });
        }
        let tasks = self.project_task_count(id);
        if tasks > 0 {
            return Err(Error::HasTasks { id: id.to_string(), count: tasks });
        }

        self.projects.remove(idx);
        tracing::debug!(project_id = id, "deleted project");
        self.persist(Collection::Projects);
        self.emit(StoreEvent::ProjectDeleted(id.to_string()));
        Ok(true)
    }

    /// Number of tasks referencing `project_id`.
    pub fn project_task_count(&self, project_id: &str) -> usize {
        self.tasks.iter().filter(|t| t.project_id.as_deref() == Some(project_id)).count()
    }

    fn task_index(&self, id: &str) -> Result<usize> {
        self.tasks.iter().position(|t| t.id == id).ok_or_else(|| Error::task_not_found(id))
    }

    fn project_index(&self, id: &str) -> Result<usize> {
        self.projects.iter().position(|p| p.id == id).ok_or_else(|| Error::project_not_found(id))
    }

    fn require_project(&self, id: &str) -> Result<()> {
        self.project_index(id).map(|_| ())
    }

    /// Validate that `parent_id` exists and that placing `id` under it keeps
    /// the forest acyclic.
    fn check_parent(&self, id: &str, parent_id: &str) -> Result<()> {
        self.require_project(parent_id)?;
        let cycle = || Error::CycleDetected { id: id.to_string(), parent_id: parent_id.to_string() };
        let mut seen = HashSet::new();
        let mut cur = Some(parent_id);
        while let Some(pid) = cur {
            if pid == id {
                return Err(cycle());
            }
            if !seen.insert(pid) {
                // Pre-existing loop that does not pass through `id`.
                break;
            }
            cur = self.project(pid).and_then(|p| p.parent_id.as_deref());
        }
        Ok(())
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::now_v7().to_string();
            if self.task(&id).is_none() && self.project(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self, collection: Collection) {
        let result = match collection {
            Collection::Tasks => write_collection(&mut self.storage, &self.keys.tasks, &self.tasks),
            Collection::Projects => {
                write_collection(&mut self.storage, &self.keys.projects, &self.projects)
            }
        };
        match result {
            Ok(()) => {
                self.unsaved.remove(&collection);
            }
            Err(e) => {
                tracing::error!(?collection, error = %e, "failed to persist; keeping in-memory state");
                self.unsaved.insert(collection);
            }
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

fn load_collection<S: Storage, T: DeserializeOwned>(storage: &S, key: &str) -> Vec<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "error reading storage, starting fresh");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(source) => {
            let e = StorageError::Corrupt { key: key.to_string(), source };
            tracing::warn!(error = %e, "error parsing storage, starting fresh");
            Vec::new()
        }
    }
}

fn write_collection<S: Storage, T: Serialize>(
    storage: &mut S,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let data = serde_json::to_string_pretty(items)
        .map_err(|source| StorageError::Encode { key: key.to_string(), source })?;
    storage.write(key, &data)
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn checked_color(color: &str) -> Result<String> {
    let color = color.trim();
    if !is_valid_color(color) {
        return Err(Error::Validation(format!("invalid colour '{color}', expected #rrggbb")));
    }
    Ok(color.to_lowercase())
}

/// Current time, never earlier than `created_at`.
fn touch(created_at: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(created_at)
}
