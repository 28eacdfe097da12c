//! Request vocabulary and resolution: predicates, ordering, projection,
//! aggregation and windows. Everything here is pure computation.

pub mod aggregate;
pub mod order;
pub mod plan;
pub mod predicate;
pub mod projection;
pub mod window;

use crate::{
    db::query::{
        aggregate::AggregateError, order::OrderError, predicate::ValidateError,
        projection::ProjectionError, window::WindowError,
    },
    model::SchemaError,
};
use thiserror::Error as ThisError;

///
/// ErrorClass
///
/// Origin of a request failure. Both classes are deterministic for a given
/// request and schema and are never worth retrying.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// A name absent from the schema registry.
    Schema,
    /// A structural mismatch between the request and the schema.
    Validation,
}

///
/// QueryError
///
/// Every failure raised before storage is touched.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("{0}")]
    Aggregate(Box<AggregateError>),

    #[error("{0}")]
    Order(Box<OrderError>),

    #[error("predicate validation failed: {0}")]
    Predicate(Box<ValidateError>),

    #[error("{0}")]
    Projection(Box<ProjectionError>),

    #[error(transparent)]
    Schema(SchemaError),

    #[error("{0}")]
    Window(Box<WindowError>),
}

impl QueryError {
    /// Classify this error by origin.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.schema_error().is_some() {
            ErrorClass::Schema
        } else {
            ErrorClass::Validation
        }
    }

    /// Underlying schema lookup failure, however deeply wrapped.
    #[must_use]
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Aggregate(err) => err.schema_error(),
            Self::Order(err) => err.schema_error(),
            Self::Predicate(err) => err.schema_error(),
            Self::Projection(err) => err.schema_error(),
            Self::Schema(err) => Some(err),
            Self::Window(err) => err.schema_error(),
        }
    }
}

impl From<AggregateError> for QueryError {
    fn from(err: AggregateError) -> Self {
        Self::Aggregate(Box::new(err))
    }
}

impl From<OrderError> for QueryError {
    fn from(err: OrderError) -> Self {
        Self::Order(Box::new(err))
    }
}

impl From<ValidateError> for QueryError {
    fn from(err: ValidateError) -> Self {
        Self::Predicate(Box::new(err))
    }
}

impl From<ProjectionError> for QueryError {
    fn from(err: ProjectionError) -> Self {
        Self::Projection(Box::new(err))
    }
}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<WindowError> for QueryError {
    fn from(err: WindowError) -> Self {
        Self::Window(Box::new(err))
    }
}

//
// Schema error extraction
//

impl ValidateError {
    #[must_use]
    pub const fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl OrderError {
    #[must_use]
    pub const fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl WindowError {
    #[must_use]
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Order(err) => err.schema_error(),
            Self::Predicate(err) => err.schema_error(),
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl ProjectionError {
    #[must_use]
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Predicate(err) => err.schema_error(),
            Self::Schema(err) => Some(err),
            Self::Window(err) => err.schema_error(),
            _ => None,
        }
    }
}

impl AggregateError {
    #[must_use]
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            Self::Order(err) => err.schema_error(),
            Self::Predicate(err) => err.schema_error(),
            Self::Schema(err) => Some(err),
            Self::Window(err) => err.schema_error(),
            _ => None,
        }
    }
}
