//! Ordering: caller-facing `OrderSpec` and its schema-resolved form.

use crate::{
    db::query::{aggregate::AggregateSpec, predicate::Row},
    model::{Cardinality, EntityDescriptor, SchemaError, SchemaRegistry},
    value::{TextMode, Value, compare_order},
};
use derive_more::{Deref, IntoIterator};
use std::{cmp::Ordering, collections::BTreeSet, fmt};
use thiserror::Error as ThisError;

///
/// OrderError
///
/// ORDER BY-specific validation failures.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum OrderError {
    /// Aggregate targets are only meaningful over grouped results.
    #[error("aggregate order target '{target}' requires a grouped aggregation")]
    AggregateOutsideGroupBy { target: String },

    /// `_count` ordering applies to to-many relations only.
    #[error("cannot order '{entity}' by the count of to-one relation '{relation}'")]
    CountOnToOne { entity: String, relation: String },

    /// The same target appears more than once.
    #[error("order target '{target}' appears multiple times")]
    DuplicateTarget { target: String },

    #[error("order path on '{entity}' must name at least one relation")]
    EmptyPath { entity: String },

    #[error("unknown order field '{field}' on '{entity}'")]
    InvalidField { entity: String, field: String },

    /// Null placement was requested for a value that can never be null.
    #[error("null ordering requested for non-nullable target '{target}'")]
    NullsOnNonNullable { target: String },

    /// Paths may only walk to-one relations.
    #[error("order path walks to-many relation '{entity}.{relation}'")]
    PathNotToOne { entity: String, relation: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("order field '{entity}.{field}' is not orderable")]
    UnorderableField { entity: String, field: String },
}

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Null placement applied when the caller does not choose one.
    #[must_use]
    pub const fn default_nulls(self) -> NullsOrder {
        match self {
            Self::Asc => NullsOrder::Last,
            Self::Desc => NullsOrder::First,
        }
    }
}

///
/// NullsOrder
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullsOrder {
    First,
    Last,
}

///
/// OrderTarget
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OrderTarget {
    /// Scalar field of the entity in scope.
    Field(String),

    /// Scalar field reached through one or more to-one relations.
    Path {
        relations: Vec<String>,
        field: String,
    },

    /// Number of rows in a to-many relation.
    RelationCount(String),

    /// Aggregate result of a grouped aggregation.
    Aggregate(AggregateSpec),
}

impl fmt::Display for OrderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Path { relations, field } => write!(f, "{}.{field}", relations.join(".")),
            Self::RelationCount(relation) => write!(f, "_count.{relation}"),
            Self::Aggregate(spec) => write!(f, "{spec}"),
        }
    }
}

///
/// OrderEntry
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderEntry {
    pub target: OrderTarget,
    pub direction: Direction,
    pub nulls: Option<NullsOrder>,
}

impl OrderEntry {
    #[must_use]
    pub const fn new(target: OrderTarget, direction: Direction) -> Self {
        Self {
            target,
            direction,
            nulls: None,
        }
    }

    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

///
/// OrderSpec
///
/// Ordered list of sort keys, most significant first.
///

#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct OrderSpec(Vec<OrderEntry>);

impl OrderSpec {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn then(mut self, entry: OrderEntry) -> Self {
        self.0.push(entry);
        self
    }

    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.then(OrderEntry::new(OrderTarget::Field(field.into()), Direction::Asc))
    }

    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.then(OrderEntry::new(OrderTarget::Field(field.into()), Direction::Desc))
    }

    /// Order by a field reached through to-one relations.
    #[must_use]
    pub fn by_path<I, S>(self, relations: I, field: impl Into<String>, direction: Direction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.then(OrderEntry::new(
            OrderTarget::Path {
                relations: relations.into_iter().map(Into::into).collect(),
                field: field.into(),
            },
            direction,
        ))
    }

    /// Order by the number of related rows.
    #[must_use]
    pub fn by_count(self, relation: impl Into<String>, direction: Direction) -> Self {
        self.then(OrderEntry::new(OrderTarget::RelationCount(relation.into()), direction))
    }

    /// Order groups by an aggregate result.
    #[must_use]
    pub fn by_aggregate(self, spec: AggregateSpec, direction: Direction) -> Self {
        self.then(OrderEntry::new(OrderTarget::Aggregate(spec), direction))
    }
}

///
/// SortKey
///
/// One resolved sort key. Row targets only; aggregate targets are resolved
/// by the grouping engine.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SortKey {
    Field(String),
    Path {
        relations: Vec<String>,
        field: String,
    },
    RelationCount(String),
}

impl SortKey {
    // Extract this key's value from a row.
    fn extract<R: Row>(&self, row: &R) -> Value {
        match self {
            Self::Field(field) => row.field(field).cloned().unwrap_or(Value::Null),
            Self::Path { relations, field } => {
                let Some((first, rest)) = relations.split_first() else {
                    return Value::Null;
                };
                let mut current = row.related(first).into_iter().next();
                for relation in rest {
                    current = current.and_then(|r| r.related(relation).into_iter().next());
                }
                current
                    .and_then(|r| r.field(field).cloned())
                    .unwrap_or(Value::Null)
            }
            Self::RelationCount(relation) => {
                Value::Int(i64::try_from(row.related(relation).len()).unwrap_or(i64::MAX))
            }
        }
    }
}

///
/// ResolvedOrderKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedOrderKey {
    pub key: SortKey,
    pub direction: Direction,
    pub nulls: NullsOrder,
}

///
/// ResolvedOrder
///
/// Schema-checked ordering that always ends with the primary-key fields, so
/// every pair of distinct rows compares unequal.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedOrder {
    keys: Vec<ResolvedOrderKey>,
    explicit: usize,
}

impl ResolvedOrder {
    #[must_use]
    pub fn keys(&self) -> &[ResolvedOrderKey] {
        &self.keys
    }

    /// True when the caller supplied at least one sort key.
    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        self.explicit > 0
    }

    /// Sort values for one row, one per key.
    #[must_use]
    pub fn sort_values<R: Row>(&self, row: &R) -> Vec<Value> {
        self.keys.iter().map(|k| k.key.extract(row)).collect()
    }

    /// Compare two rows' sort values.
    #[must_use]
    pub fn compare_values(&self, lhs: &[Value], rhs: &[Value]) -> Ordering {
        for ((key, a), b) in self.keys.iter().zip(lhs).zip(rhs) {
            let ord = compare_keyed(a, b, key.direction, key.nulls);
            if ord.is_ne() {
                return ord;
            }
        }

        Ordering::Equal
    }

    /// Sort rows in place by this ordering.
    pub fn sort<R: Row>(&self, rows: &mut Vec<R>) {
        let mut keyed = rows
            .drain(..)
            .map(|row| (self.sort_values(&row), row))
            .collect::<Vec<_>>();
        keyed.sort_by(|(a, _), (b, _)| self.compare_values(a, b));
        rows.extend(keyed.into_iter().map(|(_, row)| row));
    }
}

/// Compare two key values under one direction and null placement.
#[must_use]
pub(crate) fn compare_keyed(
    lhs: &Value,
    rhs: &Value,
    direction: Direction,
    nulls: NullsOrder,
) -> Ordering {
    match (lhs.is_null(), rhs.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match nulls {
            NullsOrder::First => Ordering::Less,
            NullsOrder::Last => Ordering::Greater,
        },
        (false, true) => match nulls {
            NullsOrder::First => Ordering::Greater,
            NullsOrder::Last => Ordering::Less,
        },
        (false, false) => {
            let ord = compare_order(lhs, rhs, TextMode::Cs).unwrap_or(Ordering::Equal);
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }
    }
}

/// Resolve an ordering for row fetches against `entity`.
pub fn resolve_order(
    registry: &SchemaRegistry,
    entity: &str,
    spec: &OrderSpec,
) -> Result<ResolvedOrder, OrderError> {
    let descriptor = registry.describe(entity)?;
    let mut seen = BTreeSet::new();
    let mut keys = Vec::with_capacity(spec.len() + 1);

    for entry in spec {
        let label = entry.target.to_string();
        if !seen.insert(label.clone()) {
            return Err(OrderError::DuplicateTarget { target: label });
        }

        let (key, nullable) = resolve_target(registry, descriptor, &entry.target)?;
        if entry.nulls.is_some() && !nullable {
            return Err(OrderError::NullsOnNonNullable { target: label });
        }

        keys.push(ResolvedOrderKey {
            key,
            direction: entry.direction,
            nulls: entry
                .nulls
                .unwrap_or_else(|| entry.direction.default_nulls()),
        });
    }

    let explicit = keys.len();
    append_primary_key(descriptor, &mut keys);

    Ok(ResolvedOrder { keys, explicit })
}

// Primary-key fields not already ordered on become an ascending tie-break.
fn append_primary_key(descriptor: &EntityDescriptor, keys: &mut Vec<ResolvedOrderKey>) {
    let Some(primary) = descriptor.primary_key() else {
        return;
    };

    for field in primary.fields() {
        let present = keys
            .iter()
            .any(|k| matches!(&k.key, SortKey::Field(f) if f == field));
        if !present {
            keys.push(ResolvedOrderKey {
                key: SortKey::Field(field.clone()),
                direction: Direction::Asc,
                nulls: Direction::Asc.default_nulls(),
            });
        }
    }
}

// Resolve one target, returning its sort key and whether it may be null.
fn resolve_target(
    registry: &SchemaRegistry,
    descriptor: &EntityDescriptor,
    target: &OrderTarget,
) -> Result<(SortKey, bool), OrderError> {
    match target {
        OrderTarget::Field(field) => {
            let nullable = check_sortable(descriptor, field)?;
            Ok((SortKey::Field(field.clone()), nullable))
        }
        OrderTarget::Path { relations, field } => {
            if relations.is_empty() {
                return Err(OrderError::EmptyPath {
                    entity: descriptor.name.clone(),
                });
            }

            let mut scope = descriptor;
            let mut nullable = false;
            for relation in relations {
                let rel = registry.resolve_relation(&scope.name, relation)?;
                if rel.cardinality.is_to_many() {
                    return Err(OrderError::PathNotToOne {
                        entity: scope.name.clone(),
                        relation: relation.clone(),
                    });
                }
                registry.inverse_of(&scope.name, relation)?;
                nullable |= rel.cardinality != Cardinality::One;
                scope = registry.describe(&rel.target)?;
            }
            nullable |= check_sortable(scope, field)?;

            Ok((
                SortKey::Path {
                    relations: relations.clone(),
                    field: field.clone(),
                },
                nullable,
            ))
        }
        OrderTarget::RelationCount(relation) => {
            let rel = registry.resolve_relation(&descriptor.name, relation)?;
            if rel.cardinality.is_to_one() {
                return Err(OrderError::CountOnToOne {
                    entity: descriptor.name.clone(),
                    relation: relation.clone(),
                });
            }
            registry.inverse_of(&descriptor.name, relation)?;

            Ok((SortKey::RelationCount(relation.clone()), false))
        }
        OrderTarget::Aggregate(_) => Err(OrderError::AggregateOutsideGroupBy {
            target: target.to_string(),
        }),
    }
}

// Returns the field's nullability when it exists and can be sorted on.
fn check_sortable(descriptor: &EntityDescriptor, field: &str) -> Result<bool, OrderError> {
    let found = descriptor
        .field(field)
        .ok_or_else(|| OrderError::InvalidField {
            entity: descriptor.name.clone(),
            field: field.to_string(),
        })?;
    if !found.kind.is_sortable() {
        return Err(OrderError::UnorderableField {
            entity: descriptor.name.clone(),
            field: field.to_string(),
        });
    }

    Ok(found.nullable)
}
