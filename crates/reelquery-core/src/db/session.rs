//! Request orchestration.
//!
//! A session ties a schema registry, a storage collaborator and engine
//! limits together and walks each request through its phases:
//! resolve, delegate, reshape, return. Nothing is retried.

use crate::{
    config::EngineConfig,
    db::{
        DbError,
        middleware::{PhaseEvent, Pipeline},
        query::{
            QueryError,
            aggregate::{
                AggregateFunction, AggregateRow, AggregateSpec, AggregationPlan,
                AggregationRequest, resolve_grouped, resolve_ungrouped,
            },
            plan::{FetchPhase, PlanSummary, QueryKind},
            predicate::Predicate,
            projection::{FetchSpec, ProjectionSpec, ResolvedFetch, resolve_fetch},
            window::resolve_unique,
        },
        response::{ResponseError, reshape_aggregate, reshape_many},
        storage::{StorageCollaborator, StoredRow},
    },
    model::SchemaRegistry,
    value::{Record, Value},
};
use std::sync::Arc;

///
/// DbSession
///
/// Request entry points over one registry and one storage collaborator.
/// Holds no per-request state; concurrent requests share nothing mutable.
///

#[derive(Debug)]
pub struct DbSession<S> {
    registry: Arc<SchemaRegistry>,
    storage: S,
    config: EngineConfig,
}

impl<S: StorageCollaborator> DbSession<S> {
    #[must_use]
    pub const fn new(registry: Arc<SchemaRegistry>, storage: S) -> Self {
        Self {
            registry,
            storage,
            config: EngineConfig::new(),
        }
    }

    #[must_use]
    pub const fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Log plan summaries at `info` for subsequent requests.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Fetch entry points
    // ---------------------------------------------------------------------

    /// Every row of `entity` matching `fetch`, shaped by its projection.
    pub fn find_many(&self, entity: &str, fetch: &FetchSpec) -> Result<Vec<Record>, DbError> {
        self.run(QueryKind::FindMany, entity, |trace| {
            self.fetch_records(trace, fetch)
        })
    }

    /// First row of the window. A backward window keeps its direction and
    /// yields the row nearest its end.
    pub fn find_first(&self, entity: &str, fetch: &FetchSpec) -> Result<Option<Record>, DbError> {
        let mut fetch = fetch.clone();
        fetch.take = Some(if matches!(fetch.take, Some(n) if n < 0) { -1 } else { 1 });

        self.run(QueryKind::FindFirst, entity, |trace| {
            Ok(self.fetch_records(trace, &fetch)?.into_iter().next())
        })
    }

    /// Row addressed by a unique-key equality predicate, if present.
    pub fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
        projection: ProjectionSpec,
    ) -> Result<Option<Record>, DbError> {
        self.run(QueryKind::FindUnique, entity, |trace| {
            let lookup =
                resolve_unique(&self.registry, entity, predicate).map_err(QueryError::from)?;
            let fetch = FetchSpec::new()
                .projection(projection)
                .filter(lookup.predicate());

            let mut records = self.fetch_records(trace, &fetch)?;
            if records.len() > 1 {
                return Err(ResponseError::MultipleRows {
                    entity: entity.to_string(),
                    count: records.len(),
                }
                .into());
            }

            Ok(records.pop())
        })
    }

    /// Like [`Self::find_unique`], but a missing row is an error.
    pub fn find_unique_or_throw(
        &self,
        entity: &str,
        predicate: &Predicate,
        projection: ProjectionSpec,
    ) -> Result<Record, DbError> {
        self.find_unique(entity, predicate, projection)?
            .ok_or_else(|| {
                ResponseError::NotFound {
                    entity: entity.to_string(),
                }
                .into()
            })
    }

    // ---------------------------------------------------------------------
    // Aggregation entry points
    // ---------------------------------------------------------------------

    /// Number of rows of `entity` matching `predicate`.
    pub fn count(&self, entity: &str, predicate: Option<Predicate>) -> Result<i64, DbError> {
        let mut request = AggregationRequest::new(entity).aggregate(AggregateSpec::count_all());
        request.predicate = predicate;

        self.run(QueryKind::Count, entity, |trace| {
            let plan = resolve_ungrouped(&self.registry, &self.config, &request)
                .map_err(QueryError::from)?;
            let row = self.aggregate_row(trace, QueryKind::Count, &plan)?;

            let count = match row.values.get(&AggregateSpec::count_all()) {
                Some(Value::Int(n)) => *n,
                _ => 0,
            };
            trace.phase(FetchPhase::Reshaped, Some(1));

            Ok(count)
        })
    }

    /// One reduced record over every matching row.
    pub fn aggregate(&self, request: &AggregationRequest) -> Result<Record, DbError> {
        let entity = request.entity.as_str();

        self.run(QueryKind::Aggregate, entity, |trace| {
            let plan = resolve_ungrouped(&self.registry, &self.config, request)
                .map_err(QueryError::from)?;
            let row = self.aggregate_row(trace, QueryKind::Aggregate, &plan)?;

            let mut records = vec![reshape_aggregate(&plan.aggregates, row)];
            self.pipeline()
                .reshape(QueryKind::Aggregate, entity, &mut records);
            trace.phase(FetchPhase::Reshaped, Some(records.len()));

            Ok(records.pop().unwrap_or_default())
        })
    }

    /// One reduced record per group that survives `having`.
    pub fn group_by(&self, request: &AggregationRequest) -> Result<Vec<Record>, DbError> {
        let entity = request.entity.as_str();

        self.run(QueryKind::GroupBy, entity, |trace| {
            let plan = resolve_grouped(&self.registry, &self.config, request)
                .map_err(QueryError::from)?;
            let rows = self.delegate_aggregation(trace, QueryKind::GroupBy, &plan)?;

            let mut records = rows
                .into_iter()
                .map(|row| reshape_aggregate(&plan.aggregates, row))
                .collect::<Vec<_>>();
            self.pipeline()
                .reshape(QueryKind::GroupBy, entity, &mut records);
            trace.phase(FetchPhase::Reshaped, Some(records.len()));

            Ok(records)
        })
    }

    // ---------------------------------------------------------------------
    // Phase plumbing
    // ---------------------------------------------------------------------

    fn pipeline(&self) -> &Pipeline {
        self.registry.pipeline()
    }

    // Bracket one request with `Requested` and a terminal phase.
    fn run<T>(
        &self,
        kind: QueryKind,
        entity: &str,
        body: impl FnOnce(&RequestTrace<'_>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let trace = RequestTrace {
            pipeline: self.pipeline(),
            kind,
            entity,
        };
        trace.phase(FetchPhase::Requested, None);

        let result = body(&trace);
        match &result {
            Ok(_) => trace.phase(FetchPhase::Returned, None),
            Err(err) => {
                tracing::warn!(
                    kind = %kind,
                    entity,
                    retryable = err.is_retryable(),
                    error = %err,
                    "request failed"
                );
                trace.phase(FetchPhase::Failed, None);
            }
        }

        result
    }

    fn fetch_records(
        &self,
        trace: &RequestTrace<'_>,
        fetch: &FetchSpec,
    ) -> Result<Vec<Record>, DbError> {
        let resolved = resolve_fetch(&self.registry, &self.config, trace.entity, fetch)
            .map_err(QueryError::from)?;
        trace.phase(FetchPhase::Validated, None);
        self.log_plan(&PlanSummary::for_fetch(trace.kind, &resolved));
        trace.phase(FetchPhase::Windowed, None);

        let rows = self.delegate_fetch(trace, &resolved)?;

        let mut records = reshape_many(&resolved.plan, rows)?;
        self.pipeline()
            .reshape(trace.kind, trace.entity, &mut records);
        trace.phase(FetchPhase::Reshaped, Some(records.len()));

        Ok(records)
    }

    fn delegate_fetch(
        &self,
        trace: &RequestTrace<'_>,
        resolved: &ResolvedFetch,
    ) -> Result<Vec<StoredRow>, DbError> {
        let rows = self.storage.fetch(resolved)?;
        trace.phase(FetchPhase::Delegated, Some(rows.len()));

        Ok(rows)
    }

    fn delegate_aggregation(
        &self,
        trace: &RequestTrace<'_>,
        kind: QueryKind,
        plan: &AggregationPlan,
    ) -> Result<Vec<AggregateRow>, DbError> {
        trace.phase(FetchPhase::Validated, None);
        self.log_plan(&PlanSummary::for_aggregation(kind, plan));
        trace.phase(FetchPhase::Windowed, None);

        let rows = self.storage.aggregate(plan)?;
        trace.phase(FetchPhase::Delegated, Some(rows.len()));

        Ok(rows)
    }

    // Ungrouped plans reduce to exactly one row.
    fn aggregate_row(
        &self,
        trace: &RequestTrace<'_>,
        kind: QueryKind,
        plan: &AggregationPlan,
    ) -> Result<AggregateRow, DbError> {
        let mut rows = self.delegate_aggregation(trace, kind, plan)?;
        if rows.len() > 1 {
            return Err(ResponseError::MultipleRows {
                entity: plan.entity.clone(),
                count: rows.len(),
            }
            .into());
        }

        let row = rows.pop();
        Ok(row.unwrap_or_else(|| empty_reduction(&plan.aggregates)))
    }

    fn log_plan(&self, summary: &PlanSummary) {
        if self.config.debug {
            tracing::info!(plan = %summary, "resolved plan");
        } else {
            tracing::debug!(plan = %summary, "resolved plan");
        }
    }
}

///
/// RequestTrace
///

struct RequestTrace<'a> {
    pipeline: &'a Pipeline,
    kind: QueryKind,
    entity: &'a str,
}

impl RequestTrace<'_> {
    fn phase(&self, phase: FetchPhase, rows: Option<usize>) {
        tracing::debug!(kind = %self.kind, entity = self.entity, ?phase, ?rows, "request phase");

        self.pipeline.phase(&PhaseEvent {
            kind: self.kind,
            entity: self.entity,
            phase,
            rows,
        });
    }
}

// Reduction of an empty input, for collaborators that return no row.
fn empty_reduction(aggregates: &[AggregateSpec]) -> AggregateRow {
    AggregateRow {
        group: Record::new(),
        values: aggregates
            .iter()
            .map(|spec| {
                let value = match spec.function {
                    AggregateFunction::Count => Value::Int(0),
                    _ => Value::Null,
                };
                (spec.clone(), value)
            })
            .collect(),
    }
}
