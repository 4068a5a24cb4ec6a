//! Calendar screen rendering.
//!
//! Draws the day, week or month layout produced by [`crate::calendar`].
//! Cells show at most the layout's task limit and a "+N more" line.

use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::calendar::{day_view, month_view, week_view, weekday_headers, CalendarCursor, DayCell};
use crate::fields::{Granularity, Status};
use crate::format::truncate;
use crate::task::Task;
use crate::tui::colors::{priority_color, ACCENT};

pub fn render_calendar(f: &mut Frame, area: Rect, tasks: &[Task], cursor: &CalendarCursor, today: NaiveDate) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} - {} ", cursor.granularity.label(), cursor.title()))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    f.render_widget(block, area);

    match cursor.granularity {
        Granularity::Day => render_day(f, inner, tasks, cursor.anchor),
        Granularity::Week => {
            let week = week_view(tasks, cursor.anchor, cursor.week_start);
            let cols = Layout::horizontal([Constraint::Ratio(1, 7); 7]).split(inner);
            for (cell, col) in week.iter().zip(cols.iter()) {
                let title = cell.date.format("%a %-d").to_string();
                render_cell(f, *col, cell, today, &title);
            }
        }
        Granularity::Month => {
            let grid = month_view(tasks, cursor.anchor, cursor.week_start);
            let [head, body] = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);
            let head_cols = Layout::horizontal([Constraint::Ratio(1, 7); 7]).split(head);
            for (name, col) in weekday_headers(cursor.week_start).iter().zip(head_cols.iter()) {
                let header = Paragraph::new(*name)
                    .alignment(Alignment::Center)
                    .style(Style::default().add_modifier(Modifier::BOLD));
                f.render_widget(header, *col);
            }
            let weeks = grid.len() as u32;
            let rows = Layout::vertical(vec![Constraint::Ratio(1, weeks.max(1)); grid.len()]).split(body);
            for (week, row) in grid.iter().zip(rows.iter()) {
                let cols = Layout::horizontal([Constraint::Ratio(1, 7); 7]).split(*row);
                for (cell, col) in week.iter().zip(cols.iter()) {
                    let title = cell.date.day().to_string();
                    render_cell(f, *col, cell, today, &title);
                }
            }
        }
    }
}

fn render_day(f: &mut Frame, area: Rect, tasks: &[Task], anchor: NaiveDate) {
    let cell = day_view(tasks, anchor);
    let lines: Vec<Line> = if cell.tasks.is_empty() {
        vec![Line::from(Span::styled("No tasks due.", Style::default().fg(Color::DarkGray)))]
    } else {
        cell.tasks
            .iter()
            .map(|t| {
                Line::from(vec![
                    Span::styled(format!("{:<8}", t.priority.label()), Style::default().fg(priority_color(t.priority))),
                    Span::raw(format!("{:<12}", t.status.label())),
                    Span::styled(t.title.clone(), task_style(t)),
                ])
            })
            .collect()
    };
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn render_cell(f: &mut Frame, area: Rect, cell: &DayCell<'_>, today: NaiveDate, title: &str) {
    let mut border = Style::default();
    if !cell.in_period {
        border = border.fg(Color::DarkGray);
    }
    if cell.date == today {
        border = border.fg(ACCENT).add_modifier(Modifier::BOLD);
    }
    let block = Block::default().borders(Borders::ALL).title(title.to_string()).border_style(border);
    let width = block.inner(area).width as usize;

    let mut lines: Vec<Line> = cell
        .tasks
        .iter()
        .map(|t| {
            Line::from(vec![
                Span::styled("▌", Style::default().fg(priority_color(t.priority))),
                Span::styled(truncate(&t.title, width.saturating_sub(1)), task_style(t)),
            ])
        })
        .collect();
    if cell.overflow > 0 {
        lines.push(Line::from(Span::styled(
            format!("+{} more", cell.overflow),
            Style::default().fg(Color::DarkGray),
        )));
    }
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn task_style(t: &Task) -> Style {
    if t.status == Status::Completed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    }
}
