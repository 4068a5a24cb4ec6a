//! Calendar projection of tasks by due date.
//!
//! Tasks are bucketed by calendar day, comparing naive dates only. The week
//! and month layouts cap how many tasks each cell lists and report the rest
//! as an overflow count.

use chrono::{Datelike, Days, Duration, Local, Months, NaiveDate, Weekday};

use crate::fields::Granularity;
use crate::task::Task;

/// Tasks listed per day in the weekly layout.
pub const WEEK_CELL_LIMIT: usize = 3;
/// Tasks listed per day in the monthly layout.
pub const MONTH_CELL_LIMIT: usize = 2;

/// Tasks due on `date`, in input order.
pub fn tasks_on_date(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| t.due_date == Some(date)).collect()
}

/// One day of a calendar layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    /// The tasks shown in the cell, at most the layout's limit.
    pub tasks: Vec<&'a Task>,
    /// Tasks due that day that did not fit in the cell.
    pub overflow: usize,
    /// False for the leading/trailing days of adjacent months in the
    /// monthly grid.
    pub in_period: bool,
}

impl<'a> DayCell<'a> {
    fn new(tasks: &'a [Task], date: NaiveDate, limit: Option<usize>, in_period: bool) -> Self {
        let mut due = tasks_on_date(tasks, date);
        let overflow = match limit {
            Some(n) if due.len() > n => {
                let hidden = due.len() - n;
                due.truncate(n);
                hidden
            }
            _ => 0,
        };
        DayCell { date, tasks: due, overflow, in_period }
    }

    /// Number of tasks due that day, shown or not.
    pub fn total(&self) -> usize {
        self.tasks.len() + self.overflow
    }
}

/// First day of the week containing `date`.
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (date.weekday().num_days_from_sunday() + 7 - week_start.num_days_from_sunday()) % 7;
    date - Duration::days(i64::from(offset))
}

/// The seven dates of the week containing `anchor`.
pub fn week_dates(anchor: NaiveDate, week_start: Weekday) -> [NaiveDate; 7] {
    let start = start_of_week(anchor, week_start);
    std::array::from_fn(|i| start + Duration::days(i as i64))
}

/// Every task due on `anchor`, uncapped.
pub fn day_view(tasks: &[Task], anchor: NaiveDate) -> DayCell<'_> {
    DayCell::new(tasks, anchor, None, true)
}

/// The week containing `anchor`, capped at [`WEEK_CELL_LIMIT`] per day.
pub fn week_view(tasks: &[Task], anchor: NaiveDate, week_start: Weekday) -> Vec<DayCell<'_>> {
    week_dates(anchor, week_start)
        .into_iter()
        .map(|d| DayCell::new(tasks, d, Some(WEEK_CELL_LIMIT), true))
        .collect()
}

/// Whole weeks covering the month of `anchor`, capped at
/// [`MONTH_CELL_LIMIT`] per day.
pub fn month_view(tasks: &[Task], anchor: NaiveDate, week_start: Weekday) -> Vec<Vec<DayCell<'_>>> {
    let month = month_index(anchor);
    let mut weeks = Vec::new();
    let mut cursor = start_of_week(first_of_month(anchor), week_start);
    while month_index(cursor) <= month {
        let week: Vec<DayCell<'_>> = (0..7)
            .map(|i| {
                let d = cursor + Duration::days(i);
                DayCell::new(tasks, d, Some(MONTH_CELL_LIMIT), month_index(d) == month)
            })
            .collect();
        weeks.push(week);
        cursor += Duration::days(7);
    }
    weeks
}

/// Anchor date and zoom level of a calendar screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCursor {
    pub anchor: NaiveDate,
    pub granularity: Granularity,
    pub week_start: Weekday,
}

impl CalendarCursor {
    pub fn new(anchor: NaiveDate, granularity: Granularity, week_start: Weekday) -> Self {
        CalendarCursor { anchor, granularity, week_start }
    }

    /// A cursor anchored on the local current date.
    pub fn today(granularity: Granularity, week_start: Weekday) -> Self {
        CalendarCursor::new(Local::now().date_naive(), granularity, week_start)
    }

    /// Step back one unit of the active granularity.
    pub fn previous(&mut self) {
        self.anchor = match self.granularity {
            Granularity::Day => self.anchor.checked_sub_days(Days::new(1)).unwrap_or(self.anchor),
            Granularity::Week => self.anchor.checked_sub_days(Days::new(7)).unwrap_or(self.anchor),
            Granularity::Month => self.anchor.checked_sub_months(Months::new(1)).unwrap_or(self.anchor),
        };
    }

    /// Step forward one unit of the active granularity.
    pub fn next(&mut self) {
        self.anchor = match self.granularity {
            Granularity::Day => self.anchor.checked_add_days(Days::new(1)).unwrap_or(self.anchor),
            Granularity::Week => self.anchor.checked_add_days(Days::new(7)).unwrap_or(self.anchor),
            Granularity::Month => self.anchor.checked_add_months(Months::new(1)).unwrap_or(self.anchor),
        };
    }

    /// Reset the anchor to `today`.
    pub fn reset(&mut self, today: NaiveDate) {
        self.anchor = today;
    }

    /// Heading for the current period.
    pub fn title(&self) -> String {
        match self.granularity {
            Granularity::Day => self.anchor.format("%B %-d, %Y").to_string(),
            Granularity::Week => {
                let days = week_dates(self.anchor, self.week_start);
                format!("{} - {}", days[0].format("%b %-d"), days[6].format("%b %-d, %Y"))
            }
            Granularity::Month => self.anchor.format("%B %Y").to_string(),
        }
    }
}

/// Short weekday names in grid order.
pub fn weekday_headers(week_start: Weekday) -> [&'static str; 7] {
    let mut day = week_start;
    std::array::from_fn(|_| {
        let name = match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        };
        day = day.succ();
        name
    })
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}
