//! Shared value types for the tracker domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (a status is always one of the enumerated
//! states, never a derived one) and participate in domain computations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when text does not name a member of one of the enumerations below.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    /// The enumeration that was being parsed (e.g. `"project status"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Macro for closed enumerations stored and exchanged as upper-case names.
// Generates: as_str(), FromStr (case-insensitive), Display.
// ---------------------------------------------------------------------------
macro_rules! named_enum {
    (
        $(#[$attr:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vattr:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vattr])* $variant, )+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the canonical upper-case name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Project state
// ---------------------------------------------------------------------------

named_enum! {
    /// Lifecycle state of a project.
    ProjectStatus("project status") {
        Planning => "PLANNING",
        InProgress => "IN_PROGRESS",
        Blocked => "BLOCKED",
        Stale => "STALE",
        Completed => "COMPLETED",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

named_enum! {
    /// Delivery risk of a project, derived from its open issues when
    /// automation is enabled.
    RiskLevel("risk level") {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

named_enum! {
    /// Workflow state of a task.
    TaskStatus("task status") {
        Todo => "TODO",
        InProgress => "IN_PROGRESS",
        Done => "DONE",
        Blocked => "BLOCKED",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    /// The state a manual toggle moves a task into.
    ///
    /// Cycles `TODO → IN_PROGRESS → DONE → TODO`; a blocked task restarts at
    /// `TODO`.
    pub fn toggled(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done | Self::Blocked => Self::Todo,
        }
    }
}

named_enum! {
    /// Priority of a task.
    TaskPriority("task priority") {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    /// Ordering weight; higher is more pressing.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

named_enum! {
    /// What a project link points at.
    LinkKind("link kind") {
        Github => "GITHUB",
        Docs => "DOCS",
        Deployment => "DEPLOYMENT",
        Other => "OTHER",
    }
}

impl Default for LinkKind {
    fn default() -> Self {
        Self::Other
    }
}

// ---------------------------------------------------------------------------
// Automation configuration
// ---------------------------------------------------------------------------

/// Per-project automation switches.
///
/// Carried on every [`crate::Project`] and handed to the reconciliation engine
/// and issue synchroniser explicitly; nothing in the domain reads automation
/// settings from ambient configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Derive status and risk from GitHub activity.
    #[serde(default)]
    pub auto_status_enabled: bool,

    /// Mirror issue lifecycle events into tasks.
    #[serde(default)]
    pub auto_sync_issues: bool,

    /// Days without a commit (and with no open PRs) before a project is stale.
    #[serde(default = "default_stale_days")]
    pub stale_days: u32,
}

/// Default staleness threshold in days.
pub const DEFAULT_STALE_DAYS: u32 = 7;

fn default_stale_days() -> u32 {
    DEFAULT_STALE_DAYS
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            auto_status_enabled: false,
            auto_sync_issues: false,
            stale_days: DEFAULT_STALE_DAYS,
        }
    }
}

impl AutomationConfig {
    /// Applies a user-supplied staleness threshold.
    ///
    /// Input that is not a non-negative integer is ignored and the previous
    /// value is kept. Returns whether the threshold changed.
    pub fn apply_stale_days(&mut self, raw: &str) -> bool {
        match raw.trim().parse::<u32>() {
            Ok(days) if days != self.stale_days => {
                self.stale_days = days;
                true
            }
            Ok(_) => false,
            Err(_) => {
                tracing::debug!(input = raw, "ignoring non-integer stale_days");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 / ISO 8601 timestamp such as GitHub's
    /// `2024-05-01T12:00:00Z`. Returns `None` for anything unparseable.
    pub fn parse(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// The calendar date of this instant in UTC.
    pub fn date(self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Whole days elapsed from `self` until `later`.
    pub fn whole_days_until(self, later: Timestamp) -> i64 {
        (later.0 - self.0).num_days()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
