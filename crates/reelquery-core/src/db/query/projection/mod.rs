//! Relation projection: which fields and relations a fetch returns, and the
//! relation-scoped sub-queries that shape each nested result.

mod resolve;

#[cfg(test)]
mod tests;

use crate::{
    db::query::{
        order::OrderSpec,
        predicate::{Predicate, ValidateError},
        window::{Cursor, Window, WindowError},
    },
    model::{RelationDescriptor, SchemaError},
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

// re-exports
pub use resolve::{resolve, resolve_fetch};

///
/// ProjectionError
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ProjectionError {
    /// Both an inclusion and an omission list were given for one entity.
    #[error("projection on '{entity}' specifies both select and omit")]
    AmbiguousSelection { entity: String },

    #[error("relation count '{entity}.{relation}' requires a to-many relation")]
    CountOnToOneRelation { entity: String, relation: String },

    #[error("relation '{entity}.{relation}' exceeds the maximum nesting depth of {limit}")]
    DepthExceeded {
        entity: String,
        relation: String,
        limit: usize,
    },

    #[error("projection on '{entity}' selects nothing")]
    EmptySelection { entity: String },

    #[error("unknown field '{field}' in projection on '{entity}'")]
    InvalidField { entity: String, field: String },

    /// Join rows only exist under a relation; a root fetch has none.
    #[error("join predicate on '{entity}' is only valid under a relation")]
    JoinPredicateAtRoot { entity: String },

    #[error("join predicate on '{entity}.{relation}' requires a join-table relation")]
    JoinPredicateWithoutJoinTable { entity: String, relation: String },

    #[error("predicate validation failed: {0}")]
    Predicate(Box<ValidateError>),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// To-one relations have at most one row; filters and windows do not apply.
    #[error("to-one relation '{entity}.{relation}' cannot take a predicate, order or window")]
    ToOneRelationArguments { entity: String, relation: String },

    #[error("{0}")]
    Window(Box<WindowError>),
}

impl From<ValidateError> for ProjectionError {
    fn from(err: ValidateError) -> Self {
        Self::Predicate(Box::new(err))
    }
}

impl From<WindowError> for ProjectionError {
    fn from(err: WindowError) -> Self {
        Self::Window(Box::new(err))
    }
}

///
/// ProjectionSpec
///
/// Output shape for one entity. `select` and `omit` are mutually exclusive
/// at the same level; nested levels are independent.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectionSpec {
    pub select: Option<BTreeSet<String>>,
    pub omit: Option<BTreeSet<String>>,
    pub relations: BTreeMap<String, FetchSpec>,
    pub counts: BTreeMap<String, Option<Predicate>>,
}

impl ProjectionSpec {
    /// Every scalar field, no relations.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn omit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Fetch a relation alongside the parent rows.
    #[must_use]
    pub fn include(mut self, relation: impl Into<String>, fetch: FetchSpec) -> Self {
        self.relations.insert(relation.into(), fetch);
        self
    }

    /// Count related rows under `_count`.
    #[must_use]
    pub fn count(mut self, relation: impl Into<String>) -> Self {
        self.counts.insert(relation.into(), None);
        self
    }

    /// Count related rows matching `predicate` under `_count`.
    #[must_use]
    pub fn count_where(mut self, relation: impl Into<String>, predicate: Predicate) -> Self {
        self.counts.insert(relation.into(), Some(predicate));
        self
    }
}

///
/// FetchSpec
///
/// A fetch of one entity set: its projection plus row filter, order and
/// window. At the root this is the whole request; under a relation it is
/// scoped to the rows related to one parent.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchSpec {
    pub projection: ProjectionSpec,
    pub predicate: Option<Predicate>,
    pub join_predicate: Option<Predicate>,
    pub order: OrderSpec,
    pub cursor: Option<Cursor>,
    pub take: Option<i64>,
    pub skip: Option<u64>,
}

impl FetchSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn projection(mut self, projection: ProjectionSpec) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Filter join rows of a many-to-many relation by their own attributes.
    #[must_use]
    pub fn join_filter(mut self, predicate: Predicate) -> Self {
        self.join_predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    #[must_use]
    pub const fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// True when this spec narrows or reorders rows.
    #[must_use]
    pub fn has_row_arguments(&self) -> bool {
        self.predicate.is_some()
            || self.join_predicate.is_some()
            || !self.order.is_empty()
            || self.cursor.is_some()
            || self.take.is_some()
            || self.skip.is_some()
    }
}

///
/// ResolvedPlan
///
/// Runtime-inspectable output shape for one entity. `fields` keeps schema
/// declaration order.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPlan {
    pub entity: String,
    pub fields: Vec<String>,
    pub relations: Vec<ResolvedRelation>,
    pub counts: Vec<RelationCountPlan>,
}

impl ResolvedPlan {
    /// Exact key set a reshaped record for this plan carries.
    #[must_use]
    pub fn output_keys(&self) -> BTreeSet<String> {
        let mut keys = self.fields.iter().cloned().collect::<BTreeSet<_>>();
        keys.extend(self.relations.iter().map(|r| r.relation.name.clone()));
        if !self.counts.is_empty() {
            keys.insert(RelationCountPlan::KEY.to_string());
        }

        keys
    }

    /// Deepest relation nesting below this plan.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.relations
            .iter()
            .map(|r| 1 + r.fetch.plan.depth())
            .max()
            .unwrap_or(0)
    }
}

///
/// ResolvedRelation
///

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRelation {
    pub relation: RelationDescriptor,
    pub fetch: ResolvedFetch,
}

///
/// ResolvedFetch
///

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFetch {
    pub plan: ResolvedPlan,

    /// Normalized row filter; the empty predicate when none was given.
    pub predicate: Predicate,

    /// Join-row filter, join-table relations only.
    pub join_predicate: Option<Predicate>,

    pub window: Window,
}

///
/// RelationCountPlan
///
/// Degenerate `count` aggregation over one to-many relation, scoped to each
/// parent row.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RelationCountPlan {
    pub relation: String,
    pub predicate: Predicate,
}

impl RelationCountPlan {
    /// Output key holding relation counts.
    pub const KEY: &'static str = "_count";
}
