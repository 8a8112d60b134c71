//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! an [`IssueNumber`] with a [`PullRequestNumber`] even though both are `u64`
//! under the hood, or a [`ProjectId`] with a [`TaskId`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for i64-wrapped newtypes (record-store row identifiers).
// Generates: struct (Copy), new(), as_i64(), Display.
// ---------------------------------------------------------------------------
macro_rules! record_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from a raw row id.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying row id.
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: record-store-assigned
// ---------------------------------------------------------------------------

record_id! {
    /// Identifies a tracked project.
    ProjectId
}

record_id! {
    /// Identifies a task belonging to exactly one project.
    TaskId
}

record_id! {
    /// Identifies a resource link attached to a project.
    LinkId
}

record_id! {
    /// Identifies one entry in a project's audit trail.
    LogEntryId
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// The per-repository number GitHub assigns to an issue.
    IssueNumber
}

u64_id! {
    /// The per-repository number GitHub assigns to a pull request.
    PullRequestNumber
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Correlates every span and event emitted while handling one unit of work
/// (a webhook delivery or a manual trigger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

/// Identifies a GitHub repository in `"owner/repo"` format.
///
/// Construction fails for anything that is not exactly two non-empty,
/// slash-separated segments, so a project without GitHub linkage is modelled
/// as `Option<RepositoryId>::None` rather than an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Creates a repository identifier, returning `None` unless `value` has
    /// the shape `owner/name`.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let trimmed = v.trim();
        let (owner, name) = trimmed.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone())
            .ok_or_else(|| format!("invalid repository '{value}', expected owner/repo"))
    }
}

impl From<RepositoryId> for String {
    fn from(value: RepositoryId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_id_requires_owner_and_name() {
        assert!(RepositoryId::new("fmu/website").is_some());
        assert!(RepositoryId::new("").is_none());
        assert!(RepositoryId::new("website").is_none());
        assert!(RepositoryId::new("/website").is_none());
        assert!(RepositoryId::new("fmu/").is_none());
        assert!(RepositoryId::new("fmu/web/site").is_none());
    }

    #[test]
    fn repository_id_trims_whitespace() {
        let repo = RepositoryId::new("  fmu/sims ").unwrap();
        assert_eq!(repo.as_str(), "fmu/sims");
    }

    #[test]
    fn repository_id_deserialises_with_validation() {
        let ok: RepositoryId = serde_json::from_str("\"fmu/sims\"").unwrap();
        assert_eq!(ok.to_string(), "fmu/sims");
        assert!(serde_json::from_str::<RepositoryId>("\"nope\"").is_err());
    }
}
