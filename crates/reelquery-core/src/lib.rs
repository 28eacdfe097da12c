//! Core engine for reelquery: schema registry, values, predicates, relation
//! projection, aggregation, pagination windows, and the storage boundary.
//!
//! Everything in this crate is synchronous and side-effect free with respect
//! to shared state. Row fetching is delegated to a [`db::StorageCollaborator`].
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod model;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only request-building vocabulary.
/// No errors, collaborators, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::query::{
            aggregate::{AggregateFunction, AggregateSpec, AggregationRequest, HavingPredicate},
            order::{Direction, NullsOrder, OrderSpec},
            predicate::{CaseMode, CompareOp, Predicate, Quantifier},
            projection::{FetchSpec, ProjectionSpec},
            window::Cursor,
        },
        model::{
            Cardinality, EntityDescriptor, FieldDescriptor, RelationDescriptor, ScalarKind,
            SchemaRegistry,
        },
        value::{Record, Value},
    };
}
