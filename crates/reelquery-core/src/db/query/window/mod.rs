//! Pagination & uniqueness: cursor/offset/limit windows over an ordered set,
//! and structural checks for single-row lookups.

mod unique;


use crate::{
    config::EngineConfig,
    db::query::{
        order::{OrderError, OrderSpec, ResolvedOrder, resolve_order},
        predicate::{Row, ValidateError},
    },
    model::{EntityDescriptor, SchemaError, SchemaRegistry},
    value::{TextMode, Value, compare_eq},
};
use derive_more::{Deref, IntoIterator};
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
};
use thiserror::Error as ThisError;

// re-exports
pub use unique::{UniqueLookup, resolve_unique};

///
/// WindowError
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum WindowError {
    /// Cursor fields do not form a declared unique key.
    #[error("cursor on '{entity}' must name exactly one unique key, got {fields:?}")]
    CursorNotUnique { entity: String, fields: Vec<String> },

    #[error("cursor value for '{entity}.{field}' is invalid: {reason}")]
    InvalidCursorValue {
        entity: String,
        field: String,
        reason: String,
    },

    /// Predicate is not exactly a unique key's equality set.
    #[error("predicate on '{entity}' is not a unique-key lookup: {reason}")]
    NotAUniquePredicate { entity: String, reason: String },

    #[error("{0}")]
    Order(Box<OrderError>),

    /// Cursor pagination needs an explicit order to be meaningful.
    #[error("cursor pagination on '{entity}' requires an explicit order")]
    OrderRequiredForCursor { entity: String },

    #[error("predicate validation failed: {0}")]
    Predicate(Box<ValidateError>),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("take {take} exceeds the configured limit of {limit}")]
    TakeExceedsLimit { take: u64, limit: u64 },
}

impl From<OrderError> for WindowError {
    fn from(err: OrderError) -> Self {
        Self::Order(Box::new(err))
    }
}

impl From<ValidateError> for WindowError {
    fn from(err: ValidateError) -> Self {
        Self::Predicate(Box::new(err))
    }
}

///
/// Cursor
///
/// Unique-key field values marking a position in an ordered set.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct Cursor(BTreeMap<String, Value>);

impl Cursor {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// True when `row` sits at this cursor position.
    #[must_use]
    pub fn matches<R: Row>(&self, row: &R) -> bool {
        self.0.iter().all(|(field, value)| {
            row.field(field)
                .is_some_and(|actual| compare_eq(actual, value, TextMode::Cs) == Some(true))
        })
    }
}

///
/// Window
///
/// Fully resolved ordering plus position. Created per fetch and consumed by
/// the storage collaborator.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Window {
    pub order: ResolvedOrder,
    pub cursor: Option<Cursor>,
    pub take: Option<i64>,
    pub skip: u64,
}

impl Window {
    /// True when the window neither positions nor limits the set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.cursor.is_none() && self.take.is_none() && self.skip == 0
    }

    /// True when `take` is negative.
    #[must_use]
    pub const fn is_backward(&self) -> bool {
        matches!(self.take, Some(n) if n < 0)
    }

    /// Order `rows` and narrow them to this window, locating the cursor
    /// among `rows` themselves.
    #[must_use]
    pub fn apply<R: Row>(&self, mut rows: Vec<R>) -> Vec<R> {
        self.order.sort(&mut rows);
        self.slice(rows)
    }

    /// Order `rows` and narrow them to this window, locating the cursor in
    /// `scope` instead.
    ///
    /// `scope` is the unfiltered set `rows` was drawn from. A cursor row that
    /// exists in `scope` marks a position even when `rows` no longer holds it;
    /// rows strictly past its sort values are kept.
    #[must_use]
    pub fn apply_within<R: Row>(&self, rows: Vec<R>, scope: &[R]) -> Vec<R> {
        let Some(cursor) = &self.cursor else {
            return self.apply(rows);
        };
        let Some(anchor) = scope.iter().find(|row| cursor.matches(*row)) else {
            return Vec::new();
        };
        let anchor = self.order.sort_values(anchor);

        let mut keyed = rows
            .into_iter()
            .map(|row| (self.order.sort_values(&row), row))
            .collect::<Vec<_>>();
        keyed.sort_by(|(a, _), (b, _)| self.order.compare_values(a, b));

        let relative = |values: &[Value]| self.order.compare_values(values, &anchor);
        let bounds = if self.is_backward() {
            0..keyed.partition_point(|(values, _)| relative(values.as_slice()).is_lt())
        } else {
            keyed.partition_point(|(values, _)| relative(values.as_slice()).is_le())..keyed.len()
        };
        let rows = keyed.into_iter().map(|(_, row)| row).collect();

        self.narrow(rows, bounds)
    }

    /// Narrow already-ordered rows to this window.
    ///
    /// The cursor row itself is excluded. `skip` counts away from the cursor
    /// in the window's direction, then `|take|` rows are kept. Results stay
    /// in order whichever way the window points.
    #[must_use]
    pub fn slice<R: Row>(&self, rows: Vec<R>) -> Vec<R> {
        let bounds = match &self.cursor {
            None => 0..rows.len(),
            Some(cursor) => match rows.iter().position(|row| cursor.matches(row)) {
                Some(index) if self.is_backward() => 0..index,
                Some(index) => index + 1..rows.len(),
                None => return Vec::new(),
            },
        };

        self.narrow(rows, bounds)
    }

    // Keep `bounds`, then apply skip and |take| moving away from the cursor.
    fn narrow<R>(&self, mut rows: Vec<R>, bounds: Range<usize>) -> Vec<R> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .take
            .map(|take| usize::try_from(take.unsigned_abs()).unwrap_or(usize::MAX));

        rows.truncate(bounds.end);
        rows.drain(..bounds.start.min(rows.len()));

        if self.is_backward() {
            let end = rows.len().saturating_sub(skip);
            let start = limit.map_or(0, |n| end.saturating_sub(n));
            rows.truncate(end);
            rows.drain(..start);
        } else {
            rows.drain(..skip.min(rows.len()));
            if let Some(n) = limit {
                rows.truncate(n);
            }
        }

        rows
    }
}

/// Resolve a pagination window for `entity`.
pub fn resolve_window(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    entity: &str,
    cursor: Option<&Cursor>,
    take: Option<i64>,
    skip: Option<u64>,
    order: &OrderSpec,
) -> Result<Window, WindowError> {
    let descriptor = registry.describe(entity)?;
    let resolved = resolve_order(registry, entity, order)?;

    if let (Some(take), Some(limit)) = (take, config.max_take)
        && take.unsigned_abs() > limit
    {
        return Err(WindowError::TakeExceedsLimit {
            take: take.unsigned_abs(),
            limit,
        });
    }

    if let Some(cursor) = cursor {
        if !resolved.is_explicit() {
            return Err(WindowError::OrderRequiredForCursor {
                entity: entity.to_string(),
            });
        }
        check_cursor(descriptor, cursor)?;
    }

    Ok(Window {
        order: resolved,
        cursor: cursor.cloned(),
        take,
        skip: skip.unwrap_or(0),
    })
}

// A cursor must name exactly one unique key with non-null, well-typed values.
fn check_cursor(descriptor: &EntityDescriptor, cursor: &Cursor) -> Result<(), WindowError> {
    let fields = cursor.keys().map(String::as_str).collect::<BTreeSet<_>>();
    if descriptor.unique_key_for(&fields).is_none() {
        return Err(WindowError::CursorNotUnique {
            entity: descriptor.name.clone(),
            fields: cursor.keys().cloned().collect(),
        });
    }

    for (field, value) in cursor {
        let invalid = |reason: &str| WindowError::InvalidCursorValue {
            entity: descriptor.name.clone(),
            field: field.clone(),
            reason: reason.to_string(),
        };
        let Some(declared) = descriptor.field(field) else {
            return Err(invalid("unknown field"));
        };
        if value.is_null() {
            return Err(invalid("null cannot mark a position"));
        }
        if !declared.kind.matches_literal(value) {
            return Err(invalid("value does not match the field type"));
        }
    }

    Ok(())
}
