//! Top-level error type for the tracker domain.
//!
//! [`TrackerError`] covers conditions an operation reports back to its caller.
//! GitHub transport failures are deliberately absent: the
//! [`crate::ActivityGateway`] contract turns them into empty results, so they
//! can never abort a reconciliation.

use thiserror::Error;

use crate::{EditError, ProjectId, StoreError, TaskId};

/// Errors returned by tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A manual update was requested for a project with no linked repository.
    #[error("project {project} has no repository configured")]
    NoRepository {
        /// The project the update was requested for.
        project: ProjectId,
    },

    /// The referenced project does not exist.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// The referenced task does not exist.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A project edit was rejected before anything was written.
    #[error("invalid project edit: {0}")]
    InvalidEdit(#[from] EditError),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
