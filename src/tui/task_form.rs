//! Task form handling for the terminal user interface.
//!
//! The form edits a task's text fields through [`InputField`]s and its
//! enumerated fields through left/right selectors, then converts itself into
//! a [`TaskDraft`] or [`TaskPatch`] for the store.

use chrono::{NaiveDate, Weekday};

use crate::error::{Error, Result};
use crate::fields::{Priority, Status};
use crate::format::parse_due_input;
use crate::project::Project;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::tree::build_forest;
use crate::tui::input::InputField;

/// Field order of the task form.
pub const TITLE_FIELD: usize = 0;
pub const DESCRIPTION_FIELD: usize = 1;
pub const PRIORITY_FIELD: usize = 2;
pub const STATUS_FIELD: usize = 3;
pub const DUE_FIELD: usize = 4;
pub const PROJECT_FIELD: usize = 5;
pub const FIELD_COUNT: usize = 6;

/// A project choice: id (None for "no project") and an indented label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectChoice {
    pub id: Option<String>,
    pub label: String,
}

/// Task form for editing fields
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    pub due: InputField,
    pub priority: Priority,
    pub status: Status,
    pub projects: Vec<ProjectChoice>,
    pub project: usize,
    pub current_field: usize,
}

impl TaskForm {
    /// An empty form, preselecting `project_id` when given.
    pub fn new(projects: &[Project], project_id: Option<&str>) -> Self {
        let choices = project_choices(projects);
        let project = choices.iter().position(|c| c.id.as_deref() == project_id).unwrap_or(0);
        let mut form = TaskForm {
            title: InputField::new(),
            description: InputField::new(),
            due: InputField::new(),
            priority: Priority::default(),
            status: Status::default(),
            projects: choices,
            project,
            current_field: TITLE_FIELD,
        };
        form.update_active_field();
        form
    }

    /// A form prefilled from an existing task.
    pub fn from_task(task: &Task, projects: &[Project]) -> Self {
        let mut form = TaskForm::new(projects, task.project_id.as_deref());
        form.title = InputField::with_value(&task.title);
        form.description = InputField::with_value(&task.description);
        form.due = InputField::with_value(&task.due_date.map(|d| d.to_string()).unwrap_or_default());
        form.priority = task.priority;
        form.status = task.status;
        form.update_active_field();
        form
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    /// Mark only the focused text field as active.
    pub fn update_active_field(&mut self) {
        self.title.active = self.current_field == TITLE_FIELD;
        self.description.active = self.current_field == DESCRIPTION_FIELD;
        self.due.active = self.current_field == DUE_FIELD;
    }

    /// The focused text field, if the focus is on one.
    pub fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_FIELD => Some(&mut self.title),
            DESCRIPTION_FIELD => Some(&mut self.description),
            DUE_FIELD => Some(&mut self.due),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_delete();
        }
    }

    /// Move the text cursor, or change the value of a selector field.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            PRIORITY_FIELD => self.priority = step(&Priority::ALL, self.priority, right),
            STATUS_FIELD => self.status = step(&Status::ALL, self.status, right),
            PROJECT_FIELD => {
                let n = self.projects.len();
                self.project = if right { (self.project + 1) % n } else { (self.project + n - 1) % n };
            }
            _ => {
                if let Some(field) = self.active_input() {
                    if right {
                        field.move_cursor_right();
                    } else {
                        field.move_cursor_left();
                    }
                }
            }
        }
    }

    pub fn selected_project(&self) -> &ProjectChoice {
        &self.projects[self.project]
    }

    fn parse_due(&self, today: NaiveDate, week_start: Weekday) -> Result<Option<NaiveDate>> {
        let raw = self.due.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_due_input(raw, today, week_start)
            .map(Some)
            .ok_or_else(|| Error::Validation(format!("unrecognised due date '{raw}'")))
    }

    /// Build the create input. Title validation is left to the store.
    pub fn to_draft(&self, today: NaiveDate, week_start: Weekday) -> Result<TaskDraft> {
        Ok(TaskDraft {
            title: self.title.value.clone(),
            description: self.description.value.trim().to_string(),
            priority: self.priority,
            status: self.status,
            due_date: self.parse_due(today, week_start)?,
            project_id: self.selected_project().id.clone(),
        })
    }

    /// Build a patch that sets every field the form shows.
    pub fn to_patch(&self, today: NaiveDate, week_start: Weekday) -> Result<TaskPatch> {
        let draft = self.to_draft(today, week_start)?;
        Ok(TaskPatch {
            title: Some(draft.title),
            description: Some(draft.description),
            priority: Some(draft.priority),
            status: Some(draft.status),
            due_date: Some(draft.due_date),
            project_id: Some(draft.project_id),
        })
    }
}

fn step<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let n = all.len();
    let i = all.iter().position(|v| *v == current).unwrap_or(0);
    all[if forward { (i + 1) % n } else { (i + n - 1) % n }]
}

/// "No project" followed by every project in tree order.
pub fn project_choices(projects: &[Project]) -> Vec<ProjectChoice> {
    let mut choices = vec![ProjectChoice { id: None, label: "None".to_string() }];
    choices.extend(build_forest(projects).all_rows().into_iter().map(|row| ProjectChoice {
        id: Some(row.project.id.clone()),
        label: format!("{}{}", "  ".repeat(row.depth), row.project.name),
    }));
    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectDraft;
    use crate::store::Store;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut form = TaskForm::new(&[], None);
        assert!(form.title.active);
        form.prev_field();
        assert_eq!(form.current_field, PROJECT_FIELD);
        form.next_field();
        form.next_field();
        assert!(form.description.active && !form.title.active);
    }

    #[test]
    fn test_selectors_cycle() {
        let mut form = TaskForm::new(&[], None);
        form.current_field = PRIORITY_FIELD;
        form.handle_left_right(true);
        assert_eq!(form.priority, Priority::High);
        form.handle_left_right(false);
        form.handle_left_right(false);
        assert_eq!(form.priority, Priority::Low);
        form.current_field = STATUS_FIELD;
        form.handle_left_right(false);
        assert_eq!(form.status, Status::Completed);
        form.handle_char('x');
        assert!(form.title.value.is_empty());
    }

    #[test]
    fn test_to_draft_parses_due_and_project() {
        let mut store = Store::in_memory();
        let work = store.create_project(ProjectDraft::new("Work")).unwrap();
        store.create_project(ProjectDraft::new("Reports").with_parent(&work.id)).unwrap();

        let mut form = TaskForm::new(store.projects(), Some(work.id.as_str()));
        assert_eq!(form.projects.len(), 3);
        assert_eq!(form.projects[2].label, "  Reports");
        for c in "Plan".chars() {
            form.handle_char(c);
        }
        form.current_field = DUE_FIELD;
        form.update_active_field();
        for c in "tomorrow".chars() {
            form.handle_char(c);
        }
        let draft = form.to_draft(ymd(2024, 6, 12), Weekday::Sun).unwrap();
        assert_eq!(draft.title, "Plan");
        assert_eq!(draft.due_date, Some(ymd(2024, 6, 13)));
        assert_eq!(draft.project_id.as_deref(), Some(work.id.as_str()));

        form.due = InputField::with_value("whenever");
        assert!(matches!(form.to_draft(ymd(2024, 6, 12), Weekday::Sun), Err(Error::Validation(_))));
        form.due = InputField::with_value("in 100000000d");
        assert!(matches!(form.to_draft(ymd(2024, 6, 12), Weekday::Sun), Err(Error::Validation(_))));
    }

    #[test]
    fn test_from_task_patch_clears_due() {
        let mut store = Store::in_memory();
        let draft = TaskDraft { due_date: Some(ymd(2024, 6, 1)), ..TaskDraft::new("a") };
        let task = store.create_task(draft).unwrap();
        let mut form = TaskForm::from_task(&task, store.projects());
        assert_eq!(form.due.value, "2024-06-01");
        form.due.clear();
        let patch = form.to_patch(ymd(2024, 6, 12), Weekday::Sun).unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.project_id, Some(None));
        let updated = store.update_task(&task.id, patch).unwrap();
        assert_eq!(updated.due_date, None);
    }
}
