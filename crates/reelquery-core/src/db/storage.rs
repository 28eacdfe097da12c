//! Storage collaborator boundary.
//!
//! The engine hands over fully validated plans and receives rows keyed by
//! relation path. Retry, connection and transaction policy belong to the
//! collaborator; the engine passes its failures through untouched.

use crate::{
    db::query::{
        aggregate::{AggregateRow, AggregationPlan},
        projection::ResolvedFetch,
    },
    value::Record,
};
use std::{collections::BTreeMap, error::Error as StdError, fmt};
use thiserror::Error as ThisError;

///
/// StorageCollaborator
///

pub trait StorageCollaborator {
    /// Execute a resolved fetch: filter, order and window root rows, then
    /// resolve each requested relation per parent row.
    fn fetch(&self, fetch: &ResolvedFetch) -> Result<Vec<StoredRow>, StorageError>;

    /// Execute an aggregation plan.
    fn aggregate(&self, plan: &AggregationPlan) -> Result<Vec<AggregateRow>, StorageError>;
}

///
/// StoredRow
///
/// One row as returned by storage. `fields` may hold more than the plan
/// selected; reshaping narrows it. `relations` is keyed by relation name and
/// holds only rows related to this parent.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredRow {
    pub fields: Record,
    pub relations: BTreeMap<String, Vec<Self>>,
    pub counts: BTreeMap<String, u64>,
}

impl StoredRow {
    #[must_use]
    pub fn new(fields: Record) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>, rows: Vec<Self>) -> Self {
        self.relations.insert(relation.into(), rows);
        self
    }

    #[must_use]
    pub fn with_count(mut self, relation: impl Into<String>, count: u64) -> Self {
        self.counts.insert(relation.into(), count);
        self
    }
}

///
/// StorageErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StorageErrorKind {
    Unavailable,
    Timeout,
    Constraint,
    Other,
}

impl StorageErrorKind {
    /// Transient kinds a caller may choose to retry.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Unavailable | Self::Timeout)
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Constraint => "constraint violation",
            Self::Other => "failure",
        };

        f.write_str(label)
    }
}

///
/// StorageError
///
/// Opaque collaborator failure. The engine never reclassifies it.
///

#[derive(Debug, ThisError)]
#[error("storage {kind}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StorageError {
    #[must_use]
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Unavailable, message)
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Timeout, message)
    }

    #[must_use]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Constraint, message)
    }

    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Other, message)
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}
