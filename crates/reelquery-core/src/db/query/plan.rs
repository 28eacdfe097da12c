//! Plan-level vocabulary shared by the session, middleware and logging.

use crate::db::query::{aggregate::AggregationPlan, projection::ResolvedFetch};
use std::fmt;

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    FindMany,
    FindFirst,
    FindUnique,
    Count,
    Aggregate,
    GroupBy,
}

impl QueryKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FindMany => "findMany",
            Self::FindFirst => "findFirst",
            Self::FindUnique => "findUnique",
            Self::Count => "count",
            Self::Aggregate => "aggregate",
            Self::GroupBy => "groupBy",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// FetchPhase
///
/// Lifecycle of a single request:
/// `Requested → Validated → Windowed → Delegated → Reshaped → Returned`.
/// `Failed` may follow any non-terminal phase. Nothing is retried.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchPhase {
    Requested,
    Validated,
    Windowed,
    Delegated,
    Reshaped,
    Returned,
    Failed,
}

impl FetchPhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Returned | Self::Failed)
    }

    /// The phase that follows on success, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Requested => Some(Self::Validated),
            Self::Validated => Some(Self::Windowed),
            Self::Windowed => Some(Self::Delegated),
            Self::Delegated => Some(Self::Reshaped),
            Self::Reshaped => Some(Self::Returned),
            Self::Returned | Self::Failed => None,
        }
    }

    /// True when moving from `self` to `to` is a legal transition.
    #[must_use]
    pub fn can_advance_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }

        to == Self::Failed || self.next() == Some(to)
    }
}

///
/// PlanSummary
///
/// Compact, loggable description of a resolved plan.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanSummary {
    pub kind: QueryKind,
    pub entity: String,
    pub fields: usize,
    pub relations: usize,
    pub depth: usize,
    pub filtered: bool,
    pub windowed: bool,
    pub grouped: bool,
}

impl PlanSummary {
    #[must_use]
    pub fn for_fetch(kind: QueryKind, fetch: &ResolvedFetch) -> Self {
        Self {
            kind,
            entity: fetch.plan.entity.clone(),
            fields: fetch.plan.fields.len(),
            relations: fetch.plan.relations.len(),
            depth: fetch.plan.depth(),
            filtered: !fetch.predicate.is_empty(),
            windowed: !fetch.window.is_unbounded(),
            grouped: false,
        }
    }

    #[must_use]
    pub fn for_aggregation(kind: QueryKind, plan: &AggregationPlan) -> Self {
        Self {
            kind,
            entity: plan.entity.clone(),
            fields: plan.aggregates.len(),
            relations: 0,
            depth: 0,
            filtered: !plan.predicate.is_empty(),
            windowed: !plan.window.is_unbounded()
                || plan
                    .grouping
                    .as_ref()
                    .is_some_and(|g| g.take.is_some() || g.skip > 0),
            grouped: plan.is_grouped(),
        }
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} fields={} relations={} depth={} filtered={} windowed={} grouped={}",
            self.kind,
            self.entity,
            self.fields,
            self.relations,
            self.depth,
            self.filtered,
            self.windowed,
            self.grouped,
        )
    }
}
