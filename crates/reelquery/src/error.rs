use derive_more::Display;
use reelquery_core::db::{
    DbError, StorageError, StorageErrorKind,
    query::{
        ErrorClass, QueryError, aggregate::AggregateError, projection::ProjectionError,
        window::WindowError,
    },
    response::ResponseError,
};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///
/// The originating core error is kept as the source so storage failures
/// reach the caller unchanged.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,

    #[serde(skip)]
    #[source]
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            cause: None,
        }
    }

    fn caused_by(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// True only for transient storage failures; request errors never are.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Store(StoreErrorKind::Unavailable | StoreErrorKind::Timeout)
        )
    }

    /// The collaborator's own error, when storage failed.
    #[must_use]
    pub fn storage_error(&self) -> Option<&StorageError> {
        self.cause
            .as_deref()?
            .downcast_ref::<DbError>()?
            .storage_error()
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        let (kind, origin) = match &err {
            DbError::Query(err) => query_kind(err),
            DbError::Response(err) => response_kind(err),
            DbError::Storage(err) => (ErrorKind::Store(err.kind.into()), ErrorOrigin::Store),
        };

        Self::new(kind, origin, err.to_string()).caused_by(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Serialize, err.to_string()).caused_by(err)
    }
}

fn query_kind(err: &QueryError) -> (ErrorKind, ErrorOrigin) {
    match err.class() {
        ErrorClass::Schema => (
            ErrorKind::Query(QueryErrorKind::Schema),
            ErrorOrigin::Schema,
        ),
        ErrorClass::Validation if is_unordered_pagination(err) => (
            ErrorKind::Query(QueryErrorKind::UnorderedPagination),
            ErrorOrigin::Query,
        ),
        ErrorClass::Validation => (
            ErrorKind::Query(QueryErrorKind::Invalid),
            ErrorOrigin::Query,
        ),
    }
}

fn response_kind(err: &ResponseError) -> (ErrorKind, ErrorOrigin) {
    match err {
        ResponseError::NotFound { .. } => (
            ErrorKind::Query(QueryErrorKind::NotFound),
            ErrorOrigin::Response,
        ),
        ResponseError::MultipleRows { .. } => (
            ErrorKind::Query(QueryErrorKind::NotUnique),
            ErrorOrigin::Response,
        ),

        // the collaborator answered with rows that do not match the plan
        ResponseError::MissingField { .. } | ResponseError::MissingRelation { .. } => {
            (ErrorKind::Internal, ErrorOrigin::Response)
        }
    }
}

fn is_unordered_pagination(err: &QueryError) -> bool {
    fn window(err: &WindowError) -> bool {
        matches!(err, WindowError::OrderRequiredForCursor { .. })
    }

    match err {
        QueryError::Window(err) => window(err),
        QueryError::Projection(err) => {
            matches!(err.as_ref(), ProjectionError::Window(inner) if window(inner))
        }
        QueryError::Aggregate(err) => match err.as_ref() {
            AggregateError::OrderRequiredForWindow { .. } => true,
            AggregateError::Window(inner) => window(inner),
            _ => false,
        },
        _ => false,
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),
    Store(StoreErrorKind),

    /// The caller cannot remediate this.
    Internal,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// A name absent from the schema registry.
    Schema,

    /// Request shape is invalid (bad fields, operators, projections).
    Invalid,

    /// Windowing or cursor pagination requires ordering but none was provided.
    UnorderedPagination,

    /// Valid request, but no row matched.
    NotFound,

    /// Request expected one row but matched many.
    NotUnique,
}

///
/// StoreErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StoreErrorKind {
    Unavailable,
    Timeout,
    Constraint,
    Other,
}

impl From<StorageErrorKind> for StoreErrorKind {
    fn from(kind: StorageErrorKind) -> Self {
        match kind {
            StorageErrorKind::Unavailable => Self::Unavailable,
            StorageErrorKind::Timeout => Self::Timeout,
            StorageErrorKind::Constraint => Self::Constraint,
            StorageErrorKind::Other => Self::Other,
        }
    }
}

///
/// ErrorOrigin
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Query,
    Response,
    Schema,
    Serialize,
    Store,
}
