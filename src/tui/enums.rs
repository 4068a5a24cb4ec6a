//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    TaskList,
    AddTask,
    EditTask,
    NewProject,
    Calendar,
    Help,
    Confirm,
}

/// Which pane of the main screen receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Tasks,
}

impl Focus {
    pub fn toggled(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Tasks,
            Focus::Tasks => Focus::Sidebar,
        }
    }
}

/// One line of the task table: a group heading or a task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    Header { label: &'static str, count: usize },
    Task(String),
}

impl ListRow {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            ListRow::Task(id) => Some(id),
            ListRow::Header { .. } => None,
        }
    }
}

/// One line of the project sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarRow {
    /// Clears the project filter.
    All { count: usize },
    Project {
        id: String,
        name: String,
        color: String,
        depth: usize,
        has_children: bool,
        expanded: bool,
        count: usize,
    },
}

impl SidebarRow {
    pub fn project_id(&self) -> Option<&str> {
        match self {
            SidebarRow::All { .. } => None,
            SidebarRow::Project { id, .. } => Some(id),
        }
    }
}

/// A destructive action waiting for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteTask { id: String, title: String },
    DeleteProject { id: String, name: String },
}

impl ConfirmAction {
    pub fn describe(&self) -> String {
        match self {
            ConfirmAction::DeleteTask { title, .. } => format!("Delete task '{title}'?"),
            ConfirmAction::DeleteProject { name, .. } => format!("Delete project '{name}'?"),
        }
    }
}
