pub mod memory;
pub mod middleware;
pub mod query;
pub mod response;
pub mod session;
pub mod storage;

use crate::db::{query::QueryError, response::ResponseError};
use thiserror::Error as ThisError;

// re-exports
pub use memory::MemoryStore;
pub use middleware::{Middleware, PhaseEvent, Pipeline};
pub use session::DbSession;
pub use storage::{StorageCollaborator, StorageError, StorageErrorKind, StoredRow};

///
/// DbError
///
/// Every failure a request can surface. Query errors are raised before
/// storage is touched; storage errors are the collaborator's own, unchanged.
///

#[derive(Debug, ThisError)]
pub enum DbError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DbError {
    /// True only for transient collaborator failures.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err) => err.kind.is_transient(),
            Self::Query(_) | Self::Response(_) => false,
        }
    }

    #[must_use]
    pub const fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}
