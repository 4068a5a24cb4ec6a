//! Parsing and display helpers shared by the CLI and the TUI.
//!
//! Due dates are entered in a small natural-language form and shown relative
//! to today. Listings print fixed-width tables with truncated columns.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, Weekday};

use crate::calendar::start_of_week;
use crate::fields::Status;
use crate::project::Project;
use crate::task::Task;

/// Characters of an id shown in listings.
pub const SHORT_ID_LEN: usize = 8;

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - weekday names ("fri", "friday", "this friday"), "next friday"
/// - "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD"
pub fn parse_due_input(input: &str, today: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    let s = input.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(start_of_week(today, week_start) + Duration::days(6)),
        "end of month" | "eom" => return last_of_month(today),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let unit = rest.chars().last()?;
        let n: u32 = rest[..rest.len() - unit.len_utf8()].trim().parse().ok()?;
        return match unit {
            'd' => today.checked_add_days(Days::new(u64::from(n))),
            'w' => today.checked_add_days(Days::new(u64::from(n) * 7)),
            'm' => today.checked_add_months(Months::new(n)),
            _ => None,
        };
    }

    if let Some(name) = s.strip_prefix("next ") {
        let day = parse_weekday(name)?;
        let ahead = days_until(today, day);
        return Some(today + Duration::days(if ahead == 0 { 7 } else { ahead + 7 }));
    }
    let bare = s.strip_prefix("this ").unwrap_or(&s);
    if let Some(day) = parse_weekday(bare) {
        return Some(today + Duration::days(days_until(today, day)));
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Weekday from a full or three-letter English name.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let day = match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tues" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thurs" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn days_until(today: NaiveDate, day: Weekday) -> i64 {
    let cur = today.weekday().num_days_from_monday();
    i64::from((day.num_days_from_monday() + 7 - cur) % 7)
}

fn last_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    Some(first.checked_add_months(Months::new(1))? - Duration::days(1))
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Short label for a task's due date: "Today", "Tomorrow", "Overdue" or
/// the date itself.
pub fn due_badge(task: &Task, today: NaiveDate) -> Option<String> {
    let due = task.due_date?;
    let label = if due == today {
        "Today".to_string()
    } else if due == today + Duration::days(1) {
        "Tomorrow".to_string()
    } else if task.status != Status::Completed && due < today {
        "Overdue".to_string()
    } else {
        due.format("%b %-d").to_string()
    };
    Some(label)
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// The tail of an id used in listings; accepted back as an identifier.
pub fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(SHORT_ID_LEN);
    id.get(start..).unwrap_or(id)
}

/// Name of the project a task belongs to, or "-".
pub fn project_name<'a>(projects: &'a [Project], project_id: Option<&str>) -> &'a str {
    project_id
        .and_then(|pid| projects.iter().find(|p| p.id == pid))
        .map_or("-", |p| p.name.as_str())
}

/// Header line of [`task_row`] tables.
pub fn task_header() -> String {
    format!(
        "{:<8} {:<11} {:<7} {:<10} {:<14} {}",
        "ID", "Status", "Pri", "Due", "Project", "Title"
    )
}

/// One fixed-width listing line for `task`.
pub fn task_row(task: &Task, projects: &[Project], today: NaiveDate) -> String {
    let marker = if task.is_overdue(today) { "!" } else { "" };
    format!(
        "{:<8} {:<11} {:<7} {:<10} {:<14} {}{}",
        short_id(&task.id),
        task.status.label(),
        task.priority.label(),
        format_due_relative(task.due_date, today),
        truncate(project_name(projects, task.project_id.as_deref()), 14),
        task.title,
        marker
    )
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], projects: &[Project], today: NaiveDate) {
    println!("{}", task_header());
    for t in tasks {
        println!("{}", task_row(t, projects, today));
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
pub fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
