//! Main application logic for the terminal user interface.
//!
//! `App` borrows the store for the lifetime of the session. It subscribes to
//! store events and rebuilds its derived rows whenever a mutation lands, so
//! every screen reads the same collections the command line does.

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Weekday};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell as TableCell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame, Terminal,
};

use crate::calendar::CalendarCursor;
use crate::fields::{Granularity, GroupKey, SortKey, Status};
use crate::format::{due_badge, project_name};
use crate::project::{ProjectDraft, PALETTE};
use crate::storage::Storage;
use crate::store::{Collection, Store, SubscriptionId};
use crate::tree::{build_forest, task_counts, ExpandState};
use crate::tui::{
    calendar_view::render_calendar,
    colors::{hex_to_color, priority_color, status_color, ACCENT, AMBER, DARK_RED, RED},
    enums::{AppState, ConfirmAction, Focus, ListRow, SidebarRow},
    input::InputField,
    task_form::{
        TaskForm, DESCRIPTION_FIELD, DUE_FIELD, PRIORITY_FIELD, PROJECT_FIELD, STATUS_FIELD,
        TITLE_FIELD,
    },
    utils::centered_rect,
};
use crate::view::{derive_view, ViewOptions};

/// Main application state for the terminal user interface.
pub struct App<'s, S: Storage> {
    store: &'s mut Store<S>,
    subscription: Option<SubscriptionId>,
    dirty: Rc<Cell<bool>>,
    state: AppState,
    focus: Focus,
    week_start: Weekday,
    view: ViewOptions,
    rows: Vec<ListRow>,
    task_list_state: TableState,
    expand: ExpandState,
    sidebar_rows: Vec<SidebarRow>,
    sidebar_state: ListState,
    filter_active: bool,
    task_form: TaskForm,
    editing: Option<String>,
    project_input: InputField,
    project_parent: Option<String>,
    confirm: Option<ConfirmAction>,
    calendar: CalendarCursor,
    status_message: String,
}

impl<'s, S: Storage> App<'s, S> {
    pub fn new(store: &'s mut Store<S>, week_start: Weekday) -> Self {
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        let subscription = store.subscribe(move |_| flag.set(true));
        let task_form = TaskForm::new(store.projects(), None);

        let mut app = App {
            store,
            subscription: Some(subscription),
            dirty,
            state: AppState::TaskList,
            focus: Focus::Tasks,
            week_start,
            view: ViewOptions::default(),
            rows: Vec::new(),
            task_list_state: TableState::default(),
            expand: ExpandState::new(),
            sidebar_rows: Vec::new(),
            sidebar_state: ListState::default(),
            filter_active: false,
            task_form,
            editing: None,
            project_input: InputField::new(),
            project_parent: None,
            confirm: None,
            calendar: CalendarCursor::today(Granularity::Month, week_start),
            status_message: String::new(),
        };
        app.refresh();
        app
    }

    /// Drop the store subscription. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
        }
    }

    /// Main event loop. Returns when the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.sync();
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn sync(&mut self) {
        if self.dirty.replace(false) {
            self.refresh();
        }
    }

    /// Rebuild the task rows and the sidebar from the store, keeping the
    /// current selections where they still exist.
    fn refresh(&mut self) {
        if let Some(pid) = self.view.project_id.as_deref() {
            if self.store.project(pid).is_none() {
                self.view.project_id = None;
            }
        }

        let selected_task = self.selected_task_id().map(str::to_string);
        let grouped = self.view.group != GroupKey::None;
        let mut rows = Vec::new();
        for group in derive_view(self.store.tasks(), &self.view) {
            if grouped {
                rows.push(ListRow::Header { label: group.label(), count: group.tasks.len() });
            }
            rows.extend(group.tasks.iter().map(|t| ListRow::Task(t.id.clone())));
        }
        self.rows = rows;

        let counts = task_counts(self.store.tasks());
        let forest = build_forest(self.store.projects());
        let mut sidebar = vec![SidebarRow::All { count: self.store.tasks().len() }];
        sidebar.extend(forest.visible_rows(&self.expand).into_iter().map(|row| SidebarRow::Project {
            id: row.project.id.clone(),
            name: row.project.name.clone(),
            color: row.project.color.clone(),
            depth: row.depth,
            has_children: row.has_children,
            expanded: row.expanded,
            count: counts.get(row.project.id.as_str()).copied().unwrap_or(0),
        }));
        self.sidebar_rows = sidebar;

        let restored = selected_task.and_then(|id| self.rows.iter().position(|r| r.task_id() == Some(id.as_str())));
        match restored {
            Some(i) => self.task_list_state.select(Some(i)),
            None => {
                let current = self.task_list_state.selected().unwrap_or(0);
                self.select_task_row(current.min(self.rows.len().saturating_sub(1)));
            }
        }
        self.select_sidebar_project(self.view.project_id.clone().as_deref());
    }

    fn selected_task_id(&self) -> Option<&str> {
        self.task_list_state.selected().and_then(|i| self.rows.get(i)).and_then(ListRow::task_id)
    }

    /// Select the first task row at or after `index`, wrapping backwards
    /// past group headers.
    fn select_task_row(&mut self, index: usize) {
        let pick = (index..self.rows.len())
            .chain((0..index).rev())
            .find(|&i| self.rows[i].task_id().is_some());
        self.task_list_state.select(pick);
    }

    fn move_task_selection(&mut self, down: bool) {
        let Some(current) = self.task_list_state.selected() else {
            return;
        };
        let next = if down {
            (current + 1..self.rows.len()).find(|&i| self.rows[i].task_id().is_some())
        } else {
            (0..current).rev().find(|&i| self.rows[i].task_id().is_some())
        };
        if let Some(i) = next {
            self.task_list_state.select(Some(i));
        }
    }

    fn select_sidebar_project(&mut self, project_id: Option<&str>) {
        let idx = self.sidebar_rows.iter().position(|r| r.project_id() == project_id).unwrap_or(0);
        self.sidebar_state.select(Some(idx));
    }

    fn selected_sidebar_row(&self) -> Option<&SidebarRow> {
        self.sidebar_state.selected().and_then(|i| self.sidebar_rows.get(i))
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Dispatch a key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        self.status_message.clear();

        let quit = match self.state {
            AppState::TaskList if self.filter_active => {
                self.handle_search_input(key.code);
                false
            }
            AppState::TaskList => match self.focus {
                Focus::Tasks => self.handle_task_list_input(key.code),
                Focus::Sidebar => self.handle_sidebar_input(key.code),
            },
            AppState::AddTask | AppState::EditTask => {
                self.handle_form_input(key.code);
                false
            }
            AppState::NewProject => {
                self.handle_project_input(key.code);
                false
            }
            AppState::Calendar => {
                self.handle_calendar_input(key.code);
                false
            }
            AppState::Help => {
                self.state = AppState::TaskList;
                false
            }
            AppState::Confirm => {
                self.handle_confirm_input(key.code);
                false
            }
        };
        self.sync();
        quit
    }

    fn handle_search_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.filter_active = false;
                self.view.search.clear();
            }
            KeyCode::Enter => self.filter_active = false,
            KeyCode::Backspace => {
                self.view.search.pop();
            }
            KeyCode::Char(c) => self.view.search.push(c),
            _ => return,
        }
        self.refresh();
    }

    /// Keys shared by both panes of the main screen.
    fn handle_common_input(&mut self, key: KeyCode) -> Option<bool> {
        match key {
            KeyCode::Char('q') => return Some(true),
            KeyCode::Tab => self.focus = self.focus.toggled(),
            KeyCode::Char('/') => self.filter_active = true,
            KeyCode::Char('f') => {
                self.view.status = self.view.status.cycle();
                self.set_status_message(format!("Showing: {}", self.view.status.label()));
                self.refresh();
            }
            KeyCode::Char('s') => {
                self.view.sort = self.view.sort.cycle();
                self.set_status_message(format!("Sort: {}", self.view.sort.label()));
                self.refresh();
            }
            KeyCode::Char('g') => {
                self.view.group = self.view.group.cycle();
                self.set_status_message(format!("Group: {}", self.view.group.label()));
                self.refresh();
            }
            KeyCode::Char('v') => {
                self.calendar.reset(Self::today());
                self.state = AppState::Calendar;
            }
            KeyCode::Char('?') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Char('r') => {
                self.store.reload();
                self.set_status_message("Reloaded from storage");
            }
            _ => return None,
        }
        Some(false)
    }

    fn handle_task_list_input(&mut self, key: KeyCode) -> bool {
        if let Some(quit) = self.handle_common_input(key) {
            return quit;
        }
        match key {
            KeyCode::Esc => {
                if self.view.search.is_empty() {
                    return true;
                }
                self.view.search.clear();
                self.refresh();
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_task_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_task_selection(true),
            KeyCode::Char('a') => self.open_add_form(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_form(),
            KeyCode::Char(' ') | KeyCode::Char('c') => {
                if let Some(id) = self.selected_task_id().map(str::to_string) {
                    match self.store.toggle_task_status(&id) {
                        Ok(status) => self.set_status_message(format!("Marked {}", status.label())),
                        Err(e) => self.set_status_message(e.to_string()),
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task_id().and_then(|id| self.store.task(id)) {
                    self.confirm = Some(ConfirmAction::DeleteTask { id: task.id.clone(), title: task.title.clone() });
                    self.state = AppState::Confirm;
                }
            }
            KeyCode::Char('K') => self.move_task(false),
            KeyCode::Char('J') => self.move_task(true),
            _ => {}
        }
        false
    }

    /// Swap the selected task with its visible neighbour in the manual order.
    fn move_task(&mut self, down: bool) {
        if self.view.sort != SortKey::Manual {
            self.set_status_message("Reordering needs manual sort (press 's')");
            return;
        }
        let Some(current) = self.task_list_state.selected() else {
            return;
        };
        let Some(source) = self.rows.get(current).and_then(ListRow::task_id).map(str::to_string) else {
            return;
        };
        let neighbour = if down {
            self.rows[current + 1..].iter().find_map(ListRow::task_id)
        } else {
            self.rows[..current].iter().rev().find_map(ListRow::task_id)
        };
        if let Some(target) = neighbour.map(str::to_string) {
            self.store.reorder_tasks(&source, &target);
        }
    }

    fn open_add_form(&mut self) {
        self.task_form = TaskForm::new(self.store.projects(), self.view.project_id.as_deref());
        self.editing = None;
        self.state = AppState::AddTask;
    }

    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_task_id().map(str::to_string) else {
            return;
        };
        let Some(task) = self.store.task(&id) else {
            return;
        };
        self.task_form = TaskForm::from_task(task, self.store.projects());
        self.editing = Some(id);
        self.state = AppState::EditTask;
    }

    fn handle_sidebar_input(&mut self, key: KeyCode) -> bool {
        if let Some(quit) = self.handle_common_input(key) {
            return quit;
        }
        let len = self.sidebar_rows.len();
        let current = self.sidebar_state.selected().unwrap_or(0);
        match key {
            KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar_state.select(Some(current.saturating_sub(1))),
            KeyCode::Down | KeyCode::Char('j') => {
                self.sidebar_state.select(Some((current + 1).min(len.saturating_sub(1))));
            }
            KeyCode::Enter => {
                self.view.project_id = self.selected_sidebar_row().and_then(SidebarRow::project_id).map(str::to_string);
                self.focus = Focus::Tasks;
                self.refresh();
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Left | KeyCode::Char('h') => {
                let expand = matches!(key, KeyCode::Right | KeyCode::Char('l'));
                if let Some(id) = self.selected_sidebar_row().and_then(SidebarRow::project_id).map(str::to_string) {
                    if expand {
                        self.expand.expand(&id);
                    } else {
                        self.expand.collapse(&id);
                    }
                    let row = self.sidebar_state.selected();
                    self.refresh();
                    self.sidebar_state.select(row);
                }
            }
            KeyCode::Char('a') => self.open_project_prompt(None),
            KeyCode::Char('n') => {
                let parent = self.selected_sidebar_row().and_then(SidebarRow::project_id).map(str::to_string);
                if parent.is_none() {
                    self.set_status_message("Select a project to add a sub-project");
                } else {
                    self.open_project_prompt(parent);
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(SidebarRow::Project { id, name, .. }) = self.selected_sidebar_row() {
                    self.confirm = Some(ConfirmAction::DeleteProject { id: id.clone(), name: name.clone() });
                    self.state = AppState::Confirm;
                }
            }
            _ => {}
        }
        false
    }

    fn open_project_prompt(&mut self, parent: Option<String>) {
        self.project_input = InputField::new();
        self.project_input.active = true;
        self.project_parent = parent;
        self.state = AppState::NewProject;
    }

    fn handle_project_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.state = AppState::TaskList,
            KeyCode::Enter => self.create_project(),
            KeyCode::Char(c) => self.project_input.handle_char(c),
            KeyCode::Backspace => self.project_input.handle_backspace(),
            KeyCode::Delete => self.project_input.handle_delete(),
            KeyCode::Left => self.project_input.move_cursor_left(),
            KeyCode::Right => self.project_input.move_cursor_right(),
            KeyCode::Home => self.project_input.move_home(),
            KeyCode::End => self.project_input.move_end(),
            _ => {}
        }
    }

    fn create_project(&mut self) {
        let mut draft = ProjectDraft::new(self.project_input.value.trim());
        draft.parent_id = self.project_parent.clone();
        draft.color = PALETTE[self.store.projects().len() % PALETTE.len()].to_string();
        match self.store.create_project(draft) {
            Ok(project) => {
                self.expand.reveal(&project);
                self.view.project_id = Some(project.id.clone());
                self.state = AppState::TaskList;
                self.set_status_message(format!("Created project '{}'", project.name));
                self.refresh();
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn handle_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.editing = None;
                self.state = AppState::TaskList;
            }
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.prev_field(),
            KeyCode::Left => self.task_form.handle_left_right(false),
            KeyCode::Right => self.task_form.handle_left_right(true),
            KeyCode::Backspace => self.task_form.handle_backspace(),
            KeyCode::Delete => self.task_form.handle_delete(),
            KeyCode::Home => {
                if let Some(field) = self.task_form.active_input() {
                    field.move_home();
                }
            }
            KeyCode::End => {
                if let Some(field) = self.task_form.active_input() {
                    field.move_end();
                }
            }
            KeyCode::Enter => self.save_form(),
            KeyCode::Char(c) => self.task_form.handle_char(c),
            _ => {}
        }
    }

    fn save_form(&mut self) {
        let today = Self::today();
        let result = match self.editing.clone() {
            Some(id) => self
                .task_form
                .to_patch(today, self.week_start)
                .and_then(|patch| self.store.update_task(&id, patch)),
            None => self
                .task_form
                .to_draft(today, self.week_start)
                .and_then(|draft| self.store.create_task(draft)),
        };
        match result {
            Ok(task) => {
                let verb = if self.editing.is_some() { "Updated" } else { "Created" };
                self.set_status_message(format!("{verb} '{}'", task.title));
                self.editing = None;
                self.state = AppState::TaskList;
                self.refresh();
                if let Some(i) = self.rows.iter().position(|r| r.task_id() == Some(task.id.as_str())) {
                    self.task_list_state.select(Some(i));
                }
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn handle_calendar_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.state = AppState::TaskList,
            KeyCode::Left | KeyCode::Char('h') => self.calendar.previous(),
            KeyCode::Right | KeyCode::Char('l') => self.calendar.next(),
            KeyCode::Char('t') => self.calendar.reset(Self::today()),
            KeyCode::Char('g') | KeyCode::Tab => self.calendar.granularity = self.calendar.granularity.cycle(),
            _ => {}
        }
    }

    fn handle_confirm_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(action) = self.confirm.take() {
                    self.perform(action);
                }
                self.state = AppState::TaskList;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.state = AppState::TaskList;
            }
            _ => {}
        }
    }

    fn perform(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteTask { id, title } => {
                if self.store.delete_task(&id) {
                    self.set_status_message(format!("Deleted '{title}'"));
                }
            }
            ConfirmAction::DeleteProject { id, name } => match self.store.delete_project(&id) {
                Ok(_) => self.set_status_message(format!("Deleted project '{name}'")),
                Err(e) => self.set_status_message(e.to_string()),
            },
        }
    }

    fn render(&mut self, f: &mut Frame) {
        let [header, body, status] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

        self.render_header(f, header);
        match self.state {
            AppState::TaskList | AppState::Confirm | AppState::NewProject => {
                self.render_main(f, body);
                if self.state == AppState::Confirm {
                    self.render_confirm(f, body);
                }
                if self.state == AppState::NewProject {
                    self.render_project_prompt(f, body);
                }
            }
            AppState::AddTask | AppState::EditTask => self.render_task_form(f, body),
            AppState::Calendar => render_calendar(f, body, self.store.tasks(), &self.calendar, Self::today()),
            AppState::Help => self.render_help(f, body),
        }
        self.render_status_bar(f, status);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let project = self
            .view
            .project_id
            .as_deref()
            .map_or("All projects", |pid| project_name(self.store.projects(), Some(pid)));
        let context = format!(
            "{}  |  {}  |  Sort: {}  |  Group: {}",
            project,
            self.view.status.label(),
            self.view.sort.label(),
            self.view.group.label()
        );
        let text = Line::from(vec![
            Span::styled("TASKFLOW", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(context, Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC)),
        ]);
        let header = Paragraph::new(text).block(Block::default().borders(Borders::ALL)).alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_main(&mut self, f: &mut Frame, area: Rect) {
        let [sidebar, tasks] = Layout::horizontal([Constraint::Length(30), Constraint::Min(0)]).areas(area);
        self.render_sidebar(f, sidebar);
        self.render_task_table(f, tasks);
    }

    fn focus_style(&self, pane: Focus) -> Style {
        if self.focus == pane && self.state == AppState::TaskList {
            Style::default().fg(ACCENT)
        } else {
            Style::default()
        }
    }

    fn render_sidebar(&mut self, f: &mut Frame, area: Rect) {
        let selected_project = self.view.project_id.as_deref();
        let items: Vec<ListItem> = self
            .sidebar_rows
            .iter()
            .map(|row| {
                let active = row.project_id() == selected_project;
                let weight = if active { Modifier::BOLD } else { Modifier::empty() };
                match row {
                    SidebarRow::All { count } => ListItem::new(Line::from(vec![
                        Span::styled("All Tasks", Style::default().add_modifier(weight)),
                        Span::styled(format!(" ({count})"), Style::default().fg(Color::DarkGray)),
                    ])),
                    SidebarRow::Project { name, color, depth, has_children, expanded, count, .. } => {
                        let marker = match (has_children, expanded) {
                            (false, _) => " ",
                            (true, true) => "▾",
                            (true, false) => "▸",
                        };
                        ListItem::new(Line::from(vec![
                            Span::raw(format!("{}{} ", "  ".repeat(*depth), marker)),
                            Span::styled("● ", Style::default().fg(hex_to_color(color))),
                            Span::styled(name.clone(), Style::default().add_modifier(weight)),
                            Span::styled(format!(" ({count})"), Style::default().fg(Color::DarkGray)),
                        ]))
                    }
                }
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Projects")
                    .border_style(self.focus_style(Focus::Sidebar)),
            )
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black));
        f.render_stateful_widget(list, area, &mut self.sidebar_state);
    }

    fn render_task_table(&mut self, f: &mut Frame, area: Rect) {
        let today = Self::today();
        let header_cells = ["", "Title", "Priority", "Status", "Due", "Project"]
            .into_iter()
            .map(|h| TableCell::from(h).style(Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells).style(Style::default().bg(ACCENT).fg(Color::White)).height(1);

        let projects = self.store.projects();
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter_map(|row| match row {
                ListRow::Header { label, count } => Some(
                    Row::new(vec![TableCell::from(""), TableCell::from(format!("{label} ({count})"))])
                        .style(Style::default().fg(AMBER).add_modifier(Modifier::BOLD)),
                ),
                ListRow::Task(id) => self.store.task(id).map(|task| {
                    let check = if task.status == Status::Completed { "[x]" } else { "[ ]" };
                    let due_style = if task.is_overdue(today) { Style::default().fg(RED) } else { Style::default() };
                    let title_style = if task.status == Status::Completed {
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        TableCell::from(check),
                        TableCell::from(task.title.clone()).style(title_style),
                        TableCell::from(task.priority.label()).style(Style::default().fg(priority_color(task.priority))),
                        TableCell::from(task.status.label()).style(Style::default().fg(status_color(task.status))),
                        TableCell::from(due_badge(task, today).unwrap_or_else(|| "-".to_string())).style(due_style),
                        TableCell::from(project_name(projects, task.project_id.as_deref()).to_string()),
                    ])
                }),
            })
            .collect();

        let widths = [
            Constraint::Length(3),
            Constraint::Min(20),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(16),
        ];
        let shown = self.rows.iter().filter(|r| r.task_id().is_some()).count();
        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Tasks ({}/{}) - Press '?' for help", shown, self.store.tasks().len()))
                    .border_style(self.focus_style(Focus::Tasks)),
            )
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, area, &mut self.task_list_state);
    }

    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        let area = centered_rect(70, 90, area);
        let title = if self.state == AppState::EditTask { "Edit Task" } else { "New Task" };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(5), // Description
                Constraint::Length(3), // Priority
                Constraint::Length(3), // Status
                Constraint::Length(3), // Due
                Constraint::Length(3), // Project
                Constraint::Min(1),
            ])
            .split(inner);

        let form = &self.task_form;
        let field_style = |field: usize| {
            if form.current_field == field {
                Style::default().fg(ACCENT)
            } else {
                Style::default()
            }
        };
        let boxed = |title: &'static str, field: usize| {
            Block::default().borders(Borders::ALL).title(title).border_style(field_style(field))
        };

        f.render_widget(Paragraph::new(form.title.value.as_str()).block(boxed("Title *", TITLE_FIELD)), chunks[0]);
        f.render_widget(
            Paragraph::new(form.description.value.as_str())
                .block(boxed("Description", DESCRIPTION_FIELD))
                .wrap(Wrap { trim: false }),
            chunks[1],
        );
        f.render_widget(
            Paragraph::new(format!("< {} >", form.priority.label()))
                .style(Style::default().fg(priority_color(form.priority)))
                .block(boxed("Priority", PRIORITY_FIELD)),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(format!("< {} >", form.status.label())).block(boxed("Status", STATUS_FIELD)),
            chunks[3],
        );
        f.render_widget(
            Paragraph::new(form.due.value.as_str()).block(boxed("Due (YYYY-MM-DD, today, in 3d, next fri)", DUE_FIELD)),
            chunks[4],
        );
        f.render_widget(
            Paragraph::new(format!("< {} >", form.selected_project().label.trim_start()))
                .block(boxed("Project", PROJECT_FIELD)),
            chunks[5],
        );
        f.render_widget(
            Paragraph::new("Tab/Shift+Tab move  ←/→ change  Enter save  Esc cancel")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[6],
        );

        let cursor = match form.current_field {
            TITLE_FIELD => Some((chunks[0], form.title.cursor)),
            DESCRIPTION_FIELD => Some((chunks[1], form.description.cursor)),
            DUE_FIELD => Some((chunks[4], form.due.cursor)),
            _ => None,
        };
        if let Some((rect, col)) = cursor {
            let x = (rect.x + 1 + col as u16).min(rect.right().saturating_sub(2));
            f.set_cursor_position((x, rect.y + 1));
        }
    }

    fn render_project_prompt(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(50, 20, area);
        let parent = self.project_parent.as_deref().map(|pid| project_name(self.store.projects(), Some(pid)));
        let title = match parent {
            Some(name) => format!("New sub-project of '{name}'"),
            None => "New project".to_string(),
        };
        let input = Paragraph::new(self.project_input.value.as_str())
            .block(Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(ACCENT)));
        let rect = Rect { height: area.height.min(3), ..area };
        f.render_widget(Clear, rect);
        f.render_widget(input, rect);
        let x = (rect.x + 1 + self.project_input.cursor as u16).min(rect.right().saturating_sub(2));
        f.set_cursor_position((x, rect.y + 1));
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default().title("Confirm Action").borders(Borders::ALL).style(Style::default().bg(DARK_RED));
        let area = centered_rect(50, 30, area);
        f.render_widget(Clear, area);

        let question = self.confirm.as_ref().map(ConfirmAction::describe).unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(question, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let heading = |s: &'static str| Line::from(Span::styled(s, Style::default().add_modifier(Modifier::BOLD)));
        let help_text = vec![
            heading("Tasks"),
            Line::from("  ↑/↓, k/j     Move selection"),
            Line::from("  a            Add task"),
            Line::from("  e/Enter      Edit task"),
            Line::from("  Space/c      Toggle completion"),
            Line::from("  d            Delete task"),
            Line::from("  K/J          Move task up/down (manual sort)"),
            Line::from(""),
            heading("Projects (Tab to focus)"),
            Line::from("  Enter        Filter by project"),
            Line::from("  →/←, l/h     Expand/collapse"),
            Line::from("  a            New project"),
            Line::from("  n            New sub-project"),
            Line::from("  x            Delete project"),
            Line::from(""),
            heading("View"),
            Line::from("  /            Search title and description"),
            Line::from("  f            Cycle status filter"),
            Line::from("  s            Cycle sort"),
            Line::from("  g            Cycle grouping"),
            Line::from("  v            Calendar (←/→ move, t today, g zoom, Esc back)"),
            Line::from("  r            Reload from disk"),
            Line::from("  ?/F1         Show this help"),
            Line::from("  q/Esc/Ctrl+C Quit"),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let unsaved = self.store.unsaved();
        let (text, bg) = if !unsaved.is_empty() {
            let names: Vec<&str> = unsaved
                .iter()
                .map(|c| match c {
                    Collection::Tasks => "tasks",
                    Collection::Projects => "projects",
                })
                .collect();
            (format!("Unsaved changes: {} could not be written", names.join(", ")), RED)
        } else if !self.status_message.is_empty() {
            (self.status_message.clone(), ACCENT)
        } else if self.filter_active {
            (format!("Search: {}_ (Enter to keep, Esc to clear)", self.view.search), ACCENT)
        } else if !self.view.search.is_empty() {
            (format!("Filtered by '{}' | Esc to clear", self.view.search), ACCENT)
        } else {
            let hint = match self.state {
                AppState::TaskList => "Tab switch pane | ? help | q quit",
                AppState::AddTask => "Add Task",
                AppState::EditTask => "Edit Task",
                AppState::NewProject => "Enter create | Esc cancel",
                AppState::Calendar => "←/→ move | t today | g zoom | Esc back",
                AppState::Help => "Help",
                AppState::Confirm => "Confirm Action",
            };
            (hint.to_string(), ACCENT)
        };
        let status = Paragraph::new(text).style(Style::default().bg(bg).fg(Color::White));
        f.render_widget(status, area);
    }
}

impl<S: Storage> Drop for App<'_, S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::task::TaskDraft;

    fn press(app: &mut App<'_, MemoryStorage>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<'_, MemoryStorage>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_add_task_through_form() {
        let mut store = Store::in_memory();
        {
            let mut app = App::new(&mut store, Weekday::Sun);
            press(&mut app, KeyCode::Char('a'));
            assert_eq!(app.state, AppState::AddTask);
            type_text(&mut app, "Write report");
            press(&mut app, KeyCode::Enter);
            assert_eq!(app.state, AppState::TaskList);
            assert_eq!(app.rows.len(), 1);
            assert!(app.selected_task_id().is_some());
        }
        assert_eq!(store.tasks()[0].title, "Write report");
    }

    #[test]
    fn test_blank_title_keeps_form_open() {
        let mut store = Store::in_memory();
        let mut app = App::new(&mut store, Weekday::Sun);
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::AddTask);
        assert!(!app.status_message.is_empty());
    }

    #[test]
    fn test_external_mutation_refreshes_rows() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("one")).unwrap();
        let mut app = App::new(&mut store, Weekday::Sun);
        assert_eq!(app.rows.len(), 1);
        app.store.create_task(TaskDraft::new("two")).unwrap();
        assert!(app.dirty.get());
        app.sync();
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_toggle_and_delete_with_confirm() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("one")).unwrap();
        {
            let mut app = App::new(&mut store, Weekday::Sun);
            press(&mut app, KeyCode::Char(' '));
            assert_eq!(app.store.tasks()[0].status, Status::Completed);
            press(&mut app, KeyCode::Char('d'));
            assert_eq!(app.state, AppState::Confirm);
            press(&mut app, KeyCode::Char('n'));
            assert_eq!(app.store.tasks().len(), 1);
            press(&mut app, KeyCode::Char('d'));
            press(&mut app, KeyCode::Char('y'));
            assert!(app.rows.is_empty());
        }
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_move_requires_manual_sort() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("b")).unwrap();
        store.create_task(TaskDraft::new("a")).unwrap();
        {
            let mut app = App::new(&mut store, Weekday::Sun);
            press(&mut app, KeyCode::Char('J'));
            assert_eq!(app.store.tasks()[0].title, "b");
            assert_eq!(app.selected_task_id(), Some(app.store.tasks()[1].id.as_str()));

            press(&mut app, KeyCode::Char('s'));
            press(&mut app, KeyCode::Char('K'));
            assert!(app.status_message.contains("manual"));
        }
    }

    #[test]
    fn test_grouping_skips_headers_in_selection() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("one")).unwrap();
        let mut app = App::new(&mut store, Weekday::Sun);
        press(&mut app, KeyCode::Char('g'));
        assert!(matches!(app.rows[0], ListRow::Header { count: 1, .. }));
        assert_eq!(app.task_list_state.selected(), Some(1));
    }

    #[test]
    fn test_sidebar_creates_and_selects_sub_project() {
        let mut store = Store::in_memory();
        {
            let mut app = App::new(&mut store, Weekday::Sun);
            press(&mut app, KeyCode::Tab);
            press(&mut app, KeyCode::Char('a'));
            type_text(&mut app, "Work");
            press(&mut app, KeyCode::Enter);
            let work = app.view.project_id.clone().unwrap();

            press(&mut app, KeyCode::Char('n'));
            type_text(&mut app, "Reports");
            press(&mut app, KeyCode::Enter);
            let reports = app.view.project_id.clone().unwrap();
            assert_ne!(work, reports);
            assert!(app.expand.is_expanded(&work));
            assert_eq!(app.sidebar_rows.len(), 3);
            assert_eq!(app.selected_sidebar_row().and_then(SidebarRow::project_id), Some(reports.as_str()));

            // A parent with sub-projects cannot be deleted.
            app.select_sidebar_project(Some(work.as_str()));
            press(&mut app, KeyCode::Char('x'));
            press(&mut app, KeyCode::Char('y'));
            assert_eq!(app.store.projects().len(), 2);
            assert!(!app.status_message.is_empty());
        }
        assert_eq!(store.projects()[1].color, PALETTE[1]);
    }

    #[test]
    fn test_deleted_project_filter_is_dropped() {
        let mut store = Store::in_memory();
        let p = store.create_project(ProjectDraft::new("Home")).unwrap();
        let mut app = App::new(&mut store, Weekday::Sun);
        app.view.project_id = Some(p.id.clone());
        app.store.delete_project(&p.id).unwrap();
        app.sync();
        assert_eq!(app.view.project_id, None);
    }

    #[test]
    fn test_search_mode_and_quit() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("Buy milk")).unwrap();
        store.create_task(TaskDraft::new("Call bob")).unwrap();
        let mut app = App::new(&mut store, Weekday::Sun);
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "MILK");
        assert_eq!(app.rows.len(), 1);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Enter);
        assert!(!press(&mut app, KeyCode::Esc));
        assert_eq!(app.rows.len(), 2);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_close_unsubscribes() {
        let mut store = Store::in_memory();
        let dirty = {
            let mut app = App::new(&mut store, Weekday::Sun);
            app.close();
            let dirty = Rc::clone(&app.dirty);
            dirty
        };
        store.create_task(TaskDraft::new("later")).unwrap();
        assert!(!dirty.get());
    }

    #[test]
    fn test_every_screen_renders() {
        let mut store = Store::in_memory();
        let p = store.create_project(ProjectDraft::new("Work")).unwrap();
        let draft = TaskDraft {
            project_id: Some(p.id.clone()),
            due_date: Some(Local::now().date_naive()),
            ..TaskDraft::new("Ship")
        };
        store.create_task(draft).unwrap();
        let mut app = App::new(&mut store, Weekday::Mon);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        let keys = [
            KeyCode::Char('?'),
            KeyCode::Esc,
            KeyCode::Char('v'),
            KeyCode::Char('g'),
            KeyCode::Char('g'),
            KeyCode::Esc,
            KeyCode::Char('e'),
        ];
        for key in keys {
            press(&mut app, key);
            terminal.draw(|f| app.render(f)).unwrap();
        }
        assert_eq!(app.state, AppState::EditTask);
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('d'));
        terminal.draw(|f| app.render(f)).unwrap();
        assert_eq!(app.state, AppState::Confirm);
    }
}
