//! Command implementations for the CLI interface.
//!
//! Each subcommand has a `cmd_*` handler that resolves its identifiers,
//! calls into the [`Store`] and prints a short confirmation or a listing.
//! Handlers return [`Result`]; `main` reports errors and sets the exit code.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate, Weekday};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::calendar::{day_view, month_view, week_view, weekday_headers, CalendarCursor, DayCell};
use crate::config::Config;
use crate::error::{Entity, Error, Result};
use crate::fields::*;
use crate::format::*;
use crate::project::{Project, ProjectDraft, ProjectPatch, DEFAULT_COLOR};
use crate::storage::{FileStorage, Storage, StoreKeys};
use crate::store::Store;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::tree::{build_forest, task_counts};
use crate::tui::run::run_tui;
use crate::view::{derive_view, filter_tasks, GroupId, ViewOptions};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI interface.
    Ui,

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long, value_enum, default_value_t = Status::Pending)]
        status: Status,
        /// Due date: YYYY-MM-DD, "today", "fri", "next mon", "in 3d", "eow".
        #[arg(long)]
        due: Option<String>,
        /// Project id, short id or name.
        #[arg(long)]
        project: Option<String>,
    },

    /// List tasks through the filter, sort and group pipeline.
    List {
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Case-insensitive text matched against title and description.
        #[arg(long)]
        search: Option<String>,
        /// Only tasks of this project.
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value_t = SortKey::Manual)]
        sort: SortKey,
        #[arg(long, value_enum, default_value_t = GroupKey::None)]
        group: GroupKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by id or title.
    View {
        /// Task id, short id or title
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task id, short id or title
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long)]
        due: Option<String>,
        /// Clear due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(long)]
        project: Option<String>,
        /// Detach the task from its project.
        #[arg(long, conflicts_with = "project")]
        clear_project: bool,
    },

    /// Flip a task between completed and pending.
    Toggle {
        /// Task id, short id or title
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task id, short id or title
        id: String,
    },

    /// Move a task into the position another task occupies.
    Move {
        /// Task to move
        id: String,
        /// Task whose slot it takes
        target: String,
    },

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Show tasks on a calendar.
    Calendar {
        #[arg(long, value_enum, default_value_t = Granularity::Month)]
        view: Granularity,
        /// Anchor date (same formats as --due); defaults to today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Export tasks to CSV format.
    Export {
        /// Output file path (default: tasks.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Filter by project
        #[arg(long)]
        project: Option<String>,
    },

    /// Create timestamped copies of the data files.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        name: String,
        #[arg(long)]
        desc: Option<String>,
        /// Parent project id, short id or name.
        #[arg(long)]
        parent: Option<String>,
        /// Hex colour, #rrggbb.
        #[arg(long, default_value = DEFAULT_COLOR)]
        color: String,
    },
    /// Show the project tree with task counts.
    List,
    /// Update a project.
    Update {
        /// Project id, short id or name
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        /// Make the project a root.
        #[arg(long, conflicts_with = "parent")]
        clear_parent: bool,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a project without sub-projects or tasks.
    Delete {
        /// Project id, short id or name
        id: String,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_due(input: &str, week_start: Weekday) -> Result<NaiveDate> {
    parse_due_input(input, today(), week_start)
        .ok_or_else(|| Error::Validation(format!("unrecognised date '{input}'")))
}

/// Something addressable by id or by name from the command line.
trait Addressable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl Addressable for Task {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.title
    }
}

impl Addressable for Project {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Minimum length of an id fragment accepted as an identifier.
const MIN_ID_FRAGMENT: usize = 4;

/// Resolve an identifier to one item: exact id first, then a unique id
/// prefix or suffix, then a case-insensitive exact name.
fn resolve<'a, T: Addressable>(items: &'a [T], ident: &str, entity: Entity) -> Result<&'a T> {
    let ident = ident.trim();
    if let Some(item) = items.iter().find(|i| i.id() == ident) {
        return Ok(item);
    }

    if ident.len() >= MIN_ID_FRAGMENT {
        let by_id: Vec<&T> = items
            .iter()
            .filter(|i| i.id().starts_with(ident) || i.id().ends_with(ident))
            .collect();
        match by_id.len() {
            0 => {}
            1 => return Ok(by_id[0]),
            _ => return Err(ambiguous(entity, ident, &by_id)),
        }
    }

    let lowered = ident.to_lowercase();
    let by_name: Vec<&T> = items.iter().filter(|i| i.name().to_lowercase() == lowered).collect();
    match by_name.len() {
        0 => Err(Error::NotFound { entity, id: ident.to_string() }),
        1 => Ok(by_name[0]),
        _ => Err(ambiguous(entity, ident, &by_name)),
    }
}

fn ambiguous<T: Addressable>(entity: Entity, ident: &str, matches: &[&T]) -> Error {
    let mut msg = format!("multiple {entity}s match '{ident}':\n");
    for m in matches {
        let _ = writeln!(msg, "  {}  {}", short_id(m.id()), m.name());
    }
    msg.push_str("please use the id instead");
    Error::Validation(msg)
}

/// Resolve a task identifier (id, short id or title) to its id.
pub fn resolve_task<S: Storage>(store: &Store<S>, ident: &str) -> Result<String> {
    resolve(store.tasks(), ident, Entity::Task).map(|t| t.id.clone())
}

/// Resolve a project identifier (id, short id or name) to its id.
pub fn resolve_project<S: Storage>(store: &Store<S>, ident: &str) -> Result<String> {
    resolve(store.projects(), ident, Entity::Project).map(|p| p.id.clone())
}

/// Launch the terminal user interface.
pub fn cmd_ui<S: Storage>(store: &mut Store<S>, config: &Config) -> Result<()> {
    run_tui(store, config)?;
    Ok(())
}

/// Add a new task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add<S: Storage>(
    store: &mut Store<S>,
    config: &Config,
    title: String,
    desc: Option<String>,
    priority: Priority,
    status: Status,
    due: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let due_date = due.as_deref().map(|d| parse_due(d, config.week_start)).transpose()?;
    let project_id = project.as_deref().map(|p| resolve_project(store, p)).transpose()?;
    let task = store.create_task(TaskDraft {
        title,
        description: desc.unwrap_or_default(),
        priority,
        status,
        due_date,
        project_id,
    })?;
    println!("Added task {} ({})", task.title, short_id(&task.id));
    Ok(())
}

/// List tasks through the view pipeline, one table per group.
pub fn cmd_list<S: Storage>(
    store: &Store<S>,
    status: StatusFilter,
    search: Option<String>,
    project: Option<String>,
    sort: SortKey,
    group: GroupKey,
    limit: Option<usize>,
) -> Result<()> {
    let project_id = project.as_deref().map(|p| resolve_project(store, p)).transpose()?;
    let opts = ViewOptions { status, search: search.unwrap_or_default(), project_id, sort, group };
    let groups = derive_view(store.tasks(), &opts);
    if groups.iter().all(|g| g.tasks.is_empty()) {
        println!("No tasks found.");
        return Ok(());
    }

    let today = today();
    let mut remaining = limit.unwrap_or(usize::MAX);
    for g in &groups {
        if remaining == 0 {
            break;
        }
        if g.id != GroupId::All {
            println!("== {} ({}) ==", g.label(), g.tasks.len());
        }
        let shown = g.tasks.len().min(remaining);
        print_table(&g.tasks[..shown], store.projects(), today);
        remaining -= shown;
        if g.id != GroupId::All {
            println!();
        }
    }
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view<S: Storage>(store: &Store<S>, id: String) -> Result<()> {
    let task = resolve(store.tasks(), &id, Entity::Task)?;
    let today = today();
    let due = match task.due_date {
        Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
        None => "-".into(),
    };
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", task.status.label());
    println!("Priority:     {}", task.priority.label());
    println!("Project:      {}", project_name(store.projects(), task.project_id.as_deref()));
    println!("Due:          {due}");
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    println!("Updated UTC:  {}", task.updated_at.to_rfc3339());
    let desc = if task.description.is_empty() { "-" } else { task.description.as_str() };
    println!("Description:\n{desc}");
    Ok(())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update<S: Storage>(
    store: &mut Store<S>,
    config: &Config,
    id: String,
    title: Option<String>,
    desc: Option<String>,
    priority: Option<Priority>,
    status: Option<Status>,
    due: Option<String>,
    clear_due: bool,
    project: Option<String>,
    clear_project: bool,
) -> Result<()> {
    let id = resolve_task(store, &id)?;
    let due_date = if clear_due {
        Some(None)
    } else {
        due.as_deref().map(|d| parse_due(d, config.week_start).map(Some)).transpose()?
    };
    let project_id = if clear_project {
        Some(None)
    } else {
        project.as_deref().map(|p| resolve_project(store, p).map(Some)).transpose()?
    };
    let patch = TaskPatch { title, description: desc, priority, status, due_date, project_id };
    if patch.is_empty() {
        return Err(Error::Validation("nothing to update".into()));
    }
    let task = store.update_task(&id, patch)?;
    println!("Updated task {} ({})", task.title, short_id(&task.id));
    Ok(())
}

/// Flip completion of a task.
pub fn cmd_toggle<S: Storage>(store: &mut Store<S>, id: String) -> Result<()> {
    let id = resolve_task(store, &id)?;
    let status = store.toggle_task_status(&id)?;
    println!("Task {} is now {}", short_id(&id), status.label());
    Ok(())
}

/// Delete a task.
pub fn cmd_delete<S: Storage>(store: &mut Store<S>, id: String) -> Result<()> {
    let id = resolve_task(store, &id)?;
    store.delete_task(&id);
    println!("Deleted task {}", short_id(&id));
    Ok(())
}

/// Move a task into the slot of another.
pub fn cmd_move<S: Storage>(store: &mut Store<S>, id: String, target: String) -> Result<()> {
    let source = resolve_task(store, &id)?;
    let target = resolve_task(store, &target)?;
    if store.reorder_tasks(&source, &target) {
        let pos = store.tasks().iter().position(|t| t.id == source).map_or(0, |i| i + 1);
        println!("Moved task {} to position {pos}", short_id(&source));
    } else {
        println!("Nothing to move.");
    }
    Ok(())
}

/// Handle project management commands.
pub fn cmd_project<S: Storage>(store: &mut Store<S>, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::Add { name, desc, parent, color } => {
            let parent_id = parent.as_deref().map(|p| resolve_project(store, p)).transpose()?;
            let project = store.create_project(ProjectDraft { name, description: desc, parent_id, color })?;
            println!("Added project {} ({})", project.name, short_id(&project.id));
        }
        ProjectAction::List => {
            let lines = project_tree_lines(store.projects(), store.tasks());
            if lines.is_empty() {
                println!("No projects.");
            }
            for line in lines {
                println!("{line}");
            }
        }
        ProjectAction::Update { id, name, desc, parent, clear_parent, color } => {
            let id = resolve_project(store, &id)?;
            let parent_id = if clear_parent {
                Some(None)
            } else {
                parent.as_deref().map(|p| resolve_project(store, p).map(Some)).transpose()?
            };
            let patch = ProjectPatch { name, description: desc.map(Some), parent_id, color };
            let project = store.update_project(&id, patch)?;
            println!("Updated project {} ({})", project.name, short_id(&project.id));
        }
        ProjectAction::Delete { id } => {
            let id = resolve_project(store, &id)?;
            store.delete_project(&id)?;
            println!("Deleted project {}", short_id(&id));
        }
    }
    Ok(())
}

/// Indented tree lines: name, task count and short id.
pub fn project_tree_lines(projects: &[Project], tasks: &[Task]) -> Vec<String> {
    let forest = build_forest(projects);
    let counts = task_counts(tasks);
    forest
        .all_rows()
        .into_iter()
        .map(|row| {
            let n = counts.get(row.project.id.as_str()).copied().unwrap_or(0);
            format!(
                "{}{} {}  ({} task{})  {}",
                "  ".repeat(row.depth),
                if row.has_children { "▾" } else { "•" },
                row.project.name,
                n,
                if n == 1 { "" } else { "s" },
                short_id(&row.project.id)
            )
        })
        .collect()
}

/// Print the calendar for the requested granularity.
pub fn cmd_calendar<S: Storage>(
    store: &Store<S>,
    config: &Config,
    view: Granularity,
    date: Option<String>,
) -> Result<()> {
    let anchor = match date.as_deref() {
        Some(d) => parse_due(d, config.week_start)?,
        None => today(),
    };
    let cursor = CalendarCursor::new(anchor, view, config.week_start);
    print!("{}", render_calendar(store.tasks(), &cursor, today()));
    Ok(())
}

/// Plain-text calendar for `cursor`'s period.
pub fn render_calendar(tasks: &[Task], cursor: &CalendarCursor, today: NaiveDate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", cursor.title());
    match cursor.granularity {
        Granularity::Day => {
            let cell = day_view(tasks, cursor.anchor);
            if cell.tasks.is_empty() {
                out.push_str("No tasks due.\n");
            }
            for t in &cell.tasks {
                let _ = writeln!(out, "  {:<8} {:<11} {}", t.priority.label(), t.status.label(), t.title);
            }
        }
        Granularity::Week => {
            for cell in week_view(tasks, cursor.anchor, cursor.week_start) {
                let marker = if cell.date == today { "*" } else { " " };
                let _ = writeln!(out, "{marker}{}", cell.date.format("%a %b %-d"));
                write_cell_tasks(&mut out, &cell);
            }
        }
        Granularity::Month => {
            let grid = month_view(tasks, cursor.anchor, cursor.week_start);
            let header: Vec<String> = weekday_headers(cursor.week_start).iter().map(|h| format!("{h:<6}")).collect();
            let _ = writeln!(out, "{}", header.concat().trim_end());
            for week in &grid {
                let line: String = week.iter().map(month_cell_text).collect();
                let _ = writeln!(out, "{}", line.trim_end());
            }
            let busy: Vec<&DayCell<'_>> = grid.iter().flatten().filter(|c| c.in_period && c.total() > 0).collect();
            if !busy.is_empty() {
                out.push('\n');
            }
            for cell in busy {
                let _ = writeln!(out, "{}", cell.date.format("%b %-d"));
                write_cell_tasks(&mut out, cell);
            }
        }
    }
    out
}

fn write_cell_tasks(out: &mut String, cell: &DayCell<'_>) {
    for t in &cell.tasks {
        let done = if t.status == Status::Completed { "x" } else { " " };
        let _ = writeln!(out, "  [{done}] {} ({})", t.title, t.priority.label());
    }
    if cell.overflow > 0 {
        let _ = writeln!(out, "  +{} more", cell.overflow);
    }
}

/// Six-column grid cell: day number, a dot for adjacent-month days and the
/// task count.
fn month_cell_text(cell: &DayCell<'_>) -> String {
    let mark = if cell.in_period { ' ' } else { '·' };
    let count = match cell.total() {
        0 => String::new(),
        n if n < 10 => format!("+{n}"),
        _ => "+9".to_string(),
    };
    format!("{mark}{:>2}{count:<3}", cell.date.day())
}

/// Export tasks to CSV format.
pub fn cmd_export<S: Storage>(
    store: &Store<S>,
    output: Option<PathBuf>,
    status: StatusFilter,
    project: Option<String>,
) -> Result<()> {
    let output_path = output.unwrap_or_else(|| PathBuf::from("tasks.csv"));
    let project_id = project.as_deref().map(|p| resolve_project(store, p)).transpose()?;
    let tasks = filter_tasks(store.tasks(), status, project_id.as_deref(), "");
    fs::write(&output_path, tasks_to_csv(&tasks, store.projects()))?;
    println!("Exported {} task(s) to {}", tasks.len(), output_path.display());
    Ok(())
}

/// CSV document with a header row and one row per task.
pub fn tasks_to_csv(tasks: &[&Task], projects: &[Project]) -> String {
    let mut csv = String::from("ID,Title,Status,Priority,Due,Project,CreatedUTC,UpdatedUTC,Description\n");
    for t in tasks {
        let due = t.due_date.map(|d| d.to_string()).unwrap_or_default();
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{}",
            t.id,
            escape_csv(&t.title),
            t.status.label(),
            t.priority.label(),
            due,
            escape_csv(project_name(projects, t.project_id.as_deref())),
            t.created_at.to_rfc3339(),
            t.updated_at.to_rfc3339(),
            escape_csv(&t.description)
        );
    }
    csv
}

/// Copy `path` into `backup_dir` under a timestamped name.
pub fn create_backup(path: &Path, backup_dir: &Path) -> std::io::Result<PathBuf> {
    if !path.exists() {
        return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "data file does not exist"));
    }
    fs::create_dir_all(backup_dir)?;
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("data.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
    fs::copy(path, &backup_path)?;
    Ok(backup_path)
}

/// Back up both collection files into `<data dir>/backup`.
pub fn cmd_backup(storage: &FileStorage, keys: &StoreKeys) -> Result<()> {
    let backup_dir = storage.dir().join("backup");
    let mut copied = 0;
    for key in [&keys.tasks, &keys.projects] {
        let path = storage.path_for(key);
        if !path.exists() {
            tracing::debug!(key = %key, "no data file to back up");
            continue;
        }
        let dest = create_backup(&path, &backup_dir)?;
        println!("Backup created: {}", dest.display());
        copied += 1;
    }
    if copied == 0 {
        return Err(Error::Validation(format!("nothing to back up in {}", storage.dir().display())));
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn seeded() -> Store<MemoryStorage> {
        let mut store = Store::in_memory();
        let work = store.create_project(ProjectDraft::new("Work")).unwrap();
        store.create_project(ProjectDraft::new("Reports").with_parent(&work.id)).unwrap();
        store.create_project(ProjectDraft::new("Home")).unwrap();
        let draft = TaskDraft { project_id: Some(work.id.clone()), ..TaskDraft::new("Write report") };
        store.create_task(draft).unwrap();
        store.create_task(TaskDraft::new("Buy milk")).unwrap();
        store
    }

    #[test]
    fn test_resolve_by_id_fragment_and_name() {
        let store = seeded();
        let task = store.tasks()[0].clone();
        assert_eq!(resolve_task(&store, &task.id).unwrap(), task.id);
        assert_eq!(resolve_task(&store, short_id(&task.id)).unwrap(), task.id);
        assert_eq!(resolve_task(&store, "buy MILK").unwrap(), task.id);
        assert!(matches!(
            resolve_task(&store, "nothing like this"),
            Err(Error::NotFound { entity: Entity::Task, .. })
        ));
        let work = resolve_project(&store, "work").unwrap();
        assert_eq!(store.project(&work).unwrap().name, "Work");
    }

    #[test]
    fn test_resolve_reports_ambiguous_names() {
        let mut store = Store::in_memory();
        store.create_task(TaskDraft::new("dup")).unwrap();
        store.create_task(TaskDraft::new("Dup")).unwrap();
        let err = resolve_task(&store, "dup").unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("multiple tasks")));
    }

    #[test]
    fn test_update_requires_changes() {
        let mut store = seeded();
        let config = Config::with_data_dir("/unused");
        let err = cmd_update(
            &mut store,
            &config,
            "buy milk".into(),
            None,
            None,
            None,
            None,
            None,
            false,
            None,
            false,
        );
        assert!(matches!(err, Err(Error::Validation(_))));

        cmd_update(
            &mut store,
            &config,
            "buy milk".into(),
            None,
            None,
            None,
            None,
            Some("2024-06-10".into()),
            false,
            Some("home".into()),
            false,
        )
        .unwrap();
        let task = &store.tasks()[0];
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert_eq!(project_name(store.projects(), task.project_id.as_deref()), "Home");

        let bad = cmd_update(
            &mut store,
            &config,
            "buy milk".into(),
            None,
            None,
            None,
            None,
            Some("whenever".into()),
            false,
            None,
            false,
        );
        assert!(matches!(bad, Err(Error::Validation(_))));
    }

    #[test]
    fn test_project_tree_lines() {
        let store = seeded();
        let lines = project_tree_lines(store.projects(), store.tasks());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("▾ Work  (1 task)"));
        assert!(lines[1].starts_with("  • Reports  (0 tasks)"));
        assert!(lines[2].starts_with("• Home"));
    }

    #[test]
    fn test_csv_export() {
        let mut store = seeded();
        let id = resolve_task(&store, "buy milk").unwrap();
        let patch = TaskPatch { description: Some("2 litres, \"whole\"".into()), ..Default::default() };
        store.update_task(&id, patch).unwrap();
        let tasks: Vec<&Task> = store.tasks().iter().collect();
        let csv = tasks_to_csv(&tasks, store.projects());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID,Title,Status"));
        assert!(lines[1].contains(",Buy milk,Pending,Medium,,-,"));
        assert!(lines[1].ends_with(",\"2 litres, \"\"whole\"\"\""));
        assert!(lines[2].contains(",Write report,Pending,Medium,,Work,"));
    }

    #[test]
    fn test_render_month_calendar() {
        let mut store = Store::in_memory();
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        for title in ["a", "b", "c"] {
            store.create_task(TaskDraft { due_date: Some(day), ..TaskDraft::new(title) }).unwrap();
        }
        let cursor = CalendarCursor::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), Granularity::Month, Weekday::Sun);
        let text = render_calendar(store.tasks(), &cursor, day);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "June 2024");
        assert!(lines[1].starts_with("Sun   Mon"));
        assert!(lines[2].starts_with("·26"));
        assert!(lines[4].contains("10+3"));
        assert!(text.contains("Jun 10\n"));
        assert!(text.contains("  +1 more\n"));
    }

    #[test]
    fn test_render_day_calendar_empty() {
        let cursor = CalendarCursor::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), Granularity::Day, Weekday::Sun);
        let text = render_calendar(&[], &cursor, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(text, "June 15, 2024\nNo tasks due.\n");
    }

    #[test]
    fn test_backup_copies_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let keys = StoreKeys::default();
        assert!(cmd_backup(&storage, &keys).is_err());

        let mut store = Store::open(storage.clone(), keys.clone());
        store.create_task(TaskDraft::new("a")).unwrap();
        cmd_backup(store.storage(), &keys).unwrap();
        let backups: Vec<_> = fs::read_dir(dir.path().join("backup")).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }
}
