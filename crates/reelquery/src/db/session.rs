use crate::error::Error;
use reelquery_core::{
    self as core,
    config::EngineConfig,
    db::{
        StorageCollaborator,
        query::{
            aggregate::AggregationRequest,
            predicate::Predicate,
            projection::{FetchSpec, ProjectionSpec},
        },
    },
    model::SchemaRegistry,
    value::Record,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

///
/// DbSession
/// Public facade session wrapper for request execution.
/// Converts core errors into `reelquery::Error`.
///

#[derive(Debug)]
pub struct DbSession<S> {
    inner: core::db::DbSession<S>,
}

impl<S: StorageCollaborator> DbSession<S> {
    /// Create a session over a built registry and a storage collaborator.
    #[must_use]
    pub const fn new(registry: Arc<SchemaRegistry>, storage: S) -> Self {
        Self {
            inner: core::db::DbSession::new(registry, storage),
        }
    }

    #[must_use]
    pub fn with_config(self, config: EngineConfig) -> Self {
        Self {
            inner: self.inner.with_config(config),
        }
    }

    /// Log resolved plan summaries at `info` for subsequent requests.
    #[must_use]
    pub fn debug(self) -> Self {
        Self {
            inner: self.inner.debug(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        self.inner.registry()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        self.inner.storage()
    }

    //
    // Fetch entry points
    //

    pub fn find_many(&self, entity: &str, fetch: &FetchSpec) -> Result<Vec<Record>, Error> {
        Ok(self.inner.find_many(entity, fetch)?)
    }

    pub fn find_first(&self, entity: &str, fetch: &FetchSpec) -> Result<Option<Record>, Error> {
        Ok(self.inner.find_first(entity, fetch)?)
    }

    /// Only exact unique-key equality predicates are accepted.
    pub fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
        projection: ProjectionSpec,
    ) -> Result<Option<Record>, Error> {
        Ok(self.inner.find_unique(entity, predicate, projection)?)
    }

    pub fn find_unique_or_throw(
        &self,
        entity: &str,
        predicate: &Predicate,
        projection: ProjectionSpec,
    ) -> Result<Record, Error> {
        Ok(self
            .inner
            .find_unique_or_throw(entity, predicate, projection)?)
    }

    //
    // Typed fetch entry points
    //

    /// Like [`Self::find_many`], decoding each record into `T`.
    pub fn find_many_as<T: DeserializeOwned>(
        &self,
        entity: &str,
        fetch: &FetchSpec,
    ) -> Result<Vec<T>, Error> {
        self.find_many(entity, fetch)?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub fn find_first_as<T: DeserializeOwned>(
        &self,
        entity: &str,
        fetch: &FetchSpec,
    ) -> Result<Option<T>, Error> {
        self.find_first(entity, fetch)?.map(decode).transpose()
    }

    pub fn find_unique_as<T: DeserializeOwned>(
        &self,
        entity: &str,
        predicate: &Predicate,
        projection: ProjectionSpec,
    ) -> Result<Option<T>, Error> {
        self.find_unique(entity, predicate, projection)?
            .map(decode)
            .transpose()
    }

    //
    // Aggregation entry points
    //

    pub fn count(&self, entity: &str, predicate: Option<Predicate>) -> Result<i64, Error> {
        Ok(self.inner.count(entity, predicate)?)
    }

    pub fn aggregate(&self, request: &AggregationRequest) -> Result<Record, Error> {
        Ok(self.inner.aggregate(request)?)
    }

    pub fn group_by(&self, request: &AggregationRequest) -> Result<Vec<Record>, Error> {
        Ok(self.inner.group_by(request)?)
    }
}

fn decode<T: DeserializeOwned>(record: Record) -> Result<T, Error> {
    Ok(record.into_typed()?)
}
