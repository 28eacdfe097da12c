//! Aggregation & grouping: request vocabulary, static validation into an
//! `AggregationPlan`, and reference reduction over rows.

mod reduce;
mod validate;

#[cfg(test)]
mod tests;

use crate::{
    db::query::{
        order::{Direction, NullsOrder, OrderError, OrderSpec},
        predicate::{CompareOp, Predicate, ValidateError},
        window::{Window, WindowError},
    },
    model::SchemaError,
    value::{Record, Value},
};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

// re-exports
pub use validate::{resolve, resolve_grouped, resolve_ungrouped};

///
/// AggregateError
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum AggregateError {
    #[error("group field '{field}' on '{entity}' appears multiple times")]
    DuplicateGroupField { entity: String, field: String },

    /// Grouped aggregation needs at least one grouping field.
    #[error("grouped aggregation on '{entity}' must name at least one group field")]
    EmptyGroupBy { entity: String },

    #[error("having on '{entity}' references '{field}', which is neither grouped nor aggregated")]
    HavingFieldNotInGroupBy { entity: String, field: String },

    #[error("having on '{entity}' requires a grouped aggregation")]
    HavingRequiresGroupBy { entity: String },

    #[error("{function} cannot be applied to '{entity}.{field}' of type {kind}")]
    InvalidAggregateType {
        entity: String,
        field: String,
        function: AggregateFunction,
        kind: String,
    },

    #[error("unknown field '{field}' on '{entity}'")]
    InvalidField { entity: String, field: String },

    #[error("operator '{op}' is not supported in having")]
    InvalidHavingOperator { op: CompareOp },

    #[error("having value for '{target}' is invalid: {reason}")]
    InvalidHavingValue { target: String, reason: String },

    #[error("{function} requires a target field")]
    MissingAggregateField { function: AggregateFunction },

    #[error("aggregation on '{entity}' requests no aggregates")]
    NoAggregates { entity: String },

    #[error("{0}")]
    Order(Box<OrderError>),

    #[error("grouped order on '{entity}' references '{field}', which is not a group field")]
    OrderFieldNotInGroupBy { entity: String, field: String },

    /// Windowing an unordered set would pick rows arbitrarily.
    #[error("take/skip on '{entity}' requires an explicit order")]
    OrderRequiredForWindow { entity: String },

    #[error("predicate validation failed: {0}")]
    Predicate(Box<ValidateError>),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("ungrouped aggregation on '{entity}' was given group fields")]
    UnexpectedGroupBy { entity: String },

    #[error("field '{entity}.{field}' cannot be used as a group key")]
    UngroupableField { entity: String, field: String },

    #[error("order target '{target}' is not supported for grouped results")]
    UnsupportedGroupOrder { target: String },

    #[error("{0}")]
    Window(Box<WindowError>),
}

impl From<OrderError> for AggregateError {
    fn from(err: OrderError) -> Self {
        Self::Order(Box::new(err))
    }
}

impl From<ValidateError> for AggregateError {
    fn from(err: ValidateError) -> Self {
        Self::Predicate(Box::new(err))
    }
}

impl From<WindowError> for AggregateError {
    fn from(err: WindowError) -> Self {
        Self::Window(Box::new(err))
    }
}

///
/// AggregateFunction
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum AggregateFunction {
    Count,
    Avg,
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    /// Result key used in reshaped output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "_count",
            Self::Avg => "_avg",
            Self::Sum => "_sum",
            Self::Min => "_min",
            Self::Max => "_max",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// AggregateSpec
///
/// One aggregate: a function and its target field. Only `count` may omit the
/// field, meaning "all rows".
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct AggregateSpec {
    pub function: AggregateFunction,
    pub field: Option<String>,
}

impl AggregateSpec {
    /// Output key under the function's object (`_all` for row counts).
    pub const ALL: &'static str = "_all";

    #[must_use]
    pub const fn count_all() -> Self {
        Self {
            function: AggregateFunction::Count,
            field: None,
        }
    }

    #[must_use]
    pub fn count(field: impl Into<String>) -> Self {
        Self::of(AggregateFunction::Count, field)
    }

    #[must_use]
    pub fn avg(field: impl Into<String>) -> Self {
        Self::of(AggregateFunction::Avg, field)
    }

    #[must_use]
    pub fn sum(field: impl Into<String>) -> Self {
        Self::of(AggregateFunction::Sum, field)
    }

    #[must_use]
    pub fn min(field: impl Into<String>) -> Self {
        Self::of(AggregateFunction::Min, field)
    }

    #[must_use]
    pub fn max(field: impl Into<String>) -> Self {
        Self::of(AggregateFunction::Max, field)
    }

    #[must_use]
    pub fn of(function: AggregateFunction, field: impl Into<String>) -> Self {
        Self {
            function,
            field: Some(field.into()),
        }
    }

    #[must_use]
    pub fn output_key(&self) -> &str {
        self.field.as_deref().unwrap_or(Self::ALL)
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.function, self.output_key())
    }
}

///
/// HavingTarget
///
/// What a having comparison (or a grouped order key) reads: a group field or
/// an aggregate result.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HavingTarget {
    Field(String),
    Aggregate(AggregateSpec),
}

impl fmt::Display for HavingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Aggregate(spec) => write!(f, "{spec}"),
        }
    }
}

///
/// HavingPredicate
///
/// Post-aggregation filter. Evaluated per group after reduction.
///

#[derive(Clone, Debug, PartialEq)]
pub enum HavingPredicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        target: HavingTarget,
        op: CompareOp,
        value: Value,
    },
}

impl HavingPredicate {
    #[must_use]
    pub fn field(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            target: HavingTarget::Field(field.into()),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn aggregate(spec: AggregateSpec, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            target: HavingTarget::Aggregate(spec),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(pred: Self) -> Self {
        Self::Not(Box::new(pred))
    }
}

///
/// AggregationRequest
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationRequest {
    pub entity: String,
    pub predicate: Option<Predicate>,
    pub aggregates: Vec<AggregateSpec>,
    pub group_by: Option<Vec<String>>,
    pub having: Option<HavingPredicate>,
    pub order: OrderSpec,
    pub take: Option<i64>,
    pub skip: Option<u64>,
}

impl AggregationRequest {
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, spec: AggregateSpec) -> Self {
        self.aggregates.push(spec);
        self
    }

    #[must_use]
    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn having(mut self, having: HavingPredicate) -> Self {
        self.having = Some(having);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order = order;
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
}

///
/// GroupOrderKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupOrderKey {
    pub target: HavingTarget,
    pub direction: Direction,
    pub nulls: NullsOrder,
}

///
/// GroupingPlan
///
/// Grouped half of an `AggregationPlan`. `order` always ends with every
/// group field, so group order is total.
///

#[derive(Clone, Debug, PartialEq)]
pub struct GroupingPlan {
    pub fields: Vec<String>,
    pub having: Option<HavingPredicate>,
    pub order: Vec<GroupOrderKey>,
    pub take: Option<i64>,
    pub skip: u64,
}

///
/// AggregationPlan
///
/// Validated aggregation handed to the storage collaborator. Ungrouped plans
/// window rows before reducing; grouped plans window groups after having.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationPlan {
    pub entity: String,
    pub predicate: Predicate,
    pub aggregates: Vec<AggregateSpec>,
    pub window: Window,
    pub grouping: Option<GroupingPlan>,
}

impl AggregationPlan {
    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        self.grouping.is_some()
    }
}

///
/// AggregateRow
///
/// One reduced result: group-key values (empty when ungrouped) and the
/// requested aggregate values. Empty input reduces to `Null`, except counts.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateRow {
    pub group: Record,
    pub values: BTreeMap<AggregateSpec, Value>,
}
