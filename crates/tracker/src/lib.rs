//! Core domain for the repository-activity project tracker.
//!
//! This crate contains the project aggregate, the reconciliation rules that
//! turn GitHub activity into project status and risk, issue-to-task
//! synchronisation, and the port traits infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed ([`ActivityGateway`], [`ProjectStore`]);
//! infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProjectId`, `IssueNumber`, `RepositoryId`, etc.) |
//! | [`types`] | Value types (`ProjectStatus`, `RiskLevel`, `AutomationConfig`, `Timestamp`, etc.) |
//! | [`model`] | `Project`, `Task`, `Link`, `LogEntry` and their inputs |
//! | [`activity`] | `ActivityGateway` port and normalised GitHub records |
//! | [`store`] | `ProjectStore` port |
//! | [`memory`] | In-memory `ProjectStore` |
//! | [`reconcile`] | Status/risk rules and the `StatusEngine` |
//! | [`sync`] | Issue-to-task synchronisation |
//! | [`dashboard`] | Project page, today agenda, review queue, manual edits |
//! | [`errors`] | Top-level error type |

pub mod activity;
pub mod dashboard;
pub mod errors;
pub mod identifiers;
pub mod memory;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use activity::{
    ActivityGateway, Commit, Issue, ItemState, PullRequest, RepoActivity, RepoInfo, StaticGateway,
};
pub use errors::TrackerError;
pub use identifiers::{
    IssueNumber, LinkId, LogEntryId, ProjectId, PullRequestNumber, RepositoryId, RequestId, TaskId,
};
pub use memory::MemoryStore;
pub use model::{
    issue_marker, EditError, Link, LogEntry, NewLink, NewProject, NewTask, Project, ProjectEdit,
    Task,
};
pub use reconcile::{StatusEngine, UpdateReport};
pub use store::{ProjectStore, StoreError};
pub use sync::{IssueAction, IssueSnapshot, SyncOutcome};
pub use types::{
    AutomationConfig, LinkKind, ProjectStatus, RiskLevel, TaskPriority, TaskStatus, Timestamp,
    UnknownVariant, DEFAULT_STALE_DAYS,
};
