//! Row <-> record mapping.
//!
//! Enumerations are stored as their `SCREAMING_SNAKE_CASE` names, timestamps
//! as fixed-width RFC 3339 text with microsecond precision (so that text order
//! is time order) and dates as `YYYY-MM-DD`.

use chrono::{NaiveDate, SecondsFormat};
use rusqlite::types::Type;
use rusqlite::Row;
use tracker::{
    AutomationConfig, IssueNumber, Link, LinkId, LogEntry, LogEntryId, Project, ProjectId,
    RepositoryId, Task, TaskId, Timestamp,
};

pub(crate) const PROJECT_COLUMNS: &str = "id, name, description, status, risk, summary, \
     next_task, repo_name, auto_status_enabled, auto_sync_issues, stale_days, created_at, \
     updated_at";

pub(crate) const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, \
     due_date, source_issue, created_at, updated_at";

pub(crate) const LINK_COLUMNS: &str = "id, project_id, title, url, kind, created_at";

pub(crate) const LOG_COLUMNS: &str = "id, project_id, message, timestamp";

pub(crate) fn timestamp_text(ts: Timestamp) -> String {
    ts.as_datetime().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Reads a text column and converts it with `parse`.
fn text_as<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unreadable value '{raw}'")))
}

/// Reads a text column holding an enumeration name.
fn variant<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: T::Err| conversion_error(idx, e.to_string()))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    text_as(row, idx, Timestamp::parse)
}

pub(crate) fn project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let repo_name: Option<String> = row.get(7)?;
    let repo_name = match repo_name {
        None => None,
        Some(raw) => Some(
            RepositoryId::new(raw.as_str())
                .ok_or_else(|| conversion_error(7, format!("invalid repository '{raw}'")))?,
        ),
    };
    Ok(Project {
        id: ProjectId::new(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        status: variant(row, 3)?,
        risk: variant(row, 4)?,
        summary: row.get(5)?,
        next_task: row.get(6)?,
        repo_name,
        automation: AutomationConfig {
            auto_status_enabled: row.get(8)?,
            auto_sync_issues: row.get(9)?,
            stale_days: row.get(10)?,
        },
        created_at: timestamp(row, 11)?,
        updated_at: timestamp(row, 12)?,
    })
}

pub(crate) fn task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let due_date: Option<String> = row.get(6)?;
    let due_date = match due_date {
        None => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| conversion_error(6, e.to_string()))?,
        ),
    };
    let source_issue: Option<i64> = row.get(7)?;
    Ok(Task {
        id: TaskId::new(row.get(0)?),
        project_id: ProjectId::new(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        status: variant(row, 4)?,
        priority: variant(row, 5)?,
        due_date,
        source_issue: source_issue.map(|n| IssueNumber::new(n as u64)),
        created_at: timestamp(row, 8)?,
        updated_at: timestamp(row, 9)?,
    })
}

pub(crate) fn link(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: LinkId::new(row.get(0)?),
        project_id: ProjectId::new(row.get(1)?),
        title: row.get(2)?,
        url: row.get(3)?,
        kind: variant(row, 4)?,
        created_at: timestamp(row, 5)?,
    })
}

pub(crate) fn log_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: LogEntryId::new(row.get(0)?),
        project_id: ProjectId::new(row.get(1)?),
        message: row.get(2)?,
        timestamp: timestamp(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let early = Timestamp::parse("2024-05-01T09:59:59.5Z").unwrap();
        let late = Timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        let (a, b) = (timestamp_text(early), timestamp_text(late));
        assert_eq!(a, "2024-05-01T09:59:59.500000Z");
        assert_eq!(b, "2024-05-01T10:00:00.000000Z");
        assert!(a < b);
        assert_eq!(Timestamp::parse(&a), Some(early));
    }

    #[test]
    fn dates_are_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_text(d), "2024-03-07");
    }
}
