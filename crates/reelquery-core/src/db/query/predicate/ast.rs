use crate::value::{TextMode, Value};
use std::{
    fmt,
    ops::{BitAnd, BitOr},
};

///
/// Predicate AST
///
/// Pure, schema-agnostic representation of filter predicates.
/// This layer contains no type validation or execution semantics.
/// All interpretation occurs in later passes:
///
/// - validation (schema-aware)
/// - normalization
/// - evaluation (reference collaborator and tests)
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Has,
    HasEvery,
    HasSome,
}

impl CompareOp {
    #[must_use]
    pub const fn is_range(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }

    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[must_use]
    pub const fn is_text_match(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }

    #[must_use]
    pub const fn is_list_op(self) -> bool {
        matches!(self, Self::Has | Self::HasEvery | Self::HasSome)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eq => "equals",
            Self::Ne => "not",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Has => "has",
            Self::HasEvery => "hasEvery",
            Self::HasSome => "hasSome",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// CaseMode
///
/// String comparison mode. Absence of an explicit mode is always `Default`
/// (case-sensitive); insensitivity must be requested.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaseMode {
    #[default]
    Default,
    Insensitive,
}

impl CaseMode {
    #[must_use]
    pub const fn text_mode(self) -> TextMode {
        match self {
            Self::Default => TextMode::Cs,
            Self::Insensitive => TextMode::Ci,
        }
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, PartialEq)]
pub struct ComparePredicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
    pub mode: CaseMode,
}

impl ComparePredicate {
    #[must_use]
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
            mode: CaseMode::Default,
        }
    }

    /// Switch this comparison to case-insensitive matching.
    #[must_use]
    pub const fn insensitive(mut self) -> Self {
        self.mode = CaseMode::Insensitive;
        self
    }
}

///
/// Quantifier
///
/// `Every`/`Some`/`None` apply to to-many relations; `Is`/`IsNot` apply to
/// to-one relations.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quantifier {
    Every,
    Some,
    None,
    Is,
    IsNot,
}

impl Quantifier {
    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(self, Self::Every | Self::Some | Self::None)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Every => "every",
            Self::Some => "some",
            Self::None => "none",
            Self::Is => "is",
            Self::IsNot => "isNot",
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// RelationPredicate
///
/// Shifts scope to the relation's target entity for `predicate`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RelationPredicate {
    pub relation: String,
    pub quantifier: Quantifier,
    pub predicate: Box<Predicate>,
}

///
/// Predicate
///
/// `And(vec![])` is the empty (always-true) predicate; `Or(vec![])` is
/// always false.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
    IsNull { field: String },
    IsEmpty { field: String },
    Relation(RelationPredicate),
}

impl Predicate {
    /// The empty predicate, which matches every row.
    #[must_use]
    pub const fn empty() -> Self {
        Self::And(Vec::new())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::And(children) if children.is_empty())
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

    //
    // Comparisons
    //

    #[must_use]
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare(ComparePredicate::new(field, op, value))
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn in_<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::compare(field, CompareOp::In, Value::list(values))
    }

    #[must_use]
    pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::compare(field, CompareOp::NotIn, Value::list(values))
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Contains, value)
    }

    #[must_use]
    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::StartsWith, value)
    }

    #[must_use]
    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::EndsWith, value)
    }

    #[must_use]
    pub fn has(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Has, value)
    }

    #[must_use]
    pub fn has_every<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::compare(field, CompareOp::HasEvery, Value::list(values))
    }

    #[must_use]
    pub fn has_some<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::compare(field, CompareOp::HasSome, Value::list(values))
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn is_empty_list(field: impl Into<String>) -> Self {
        Self::IsEmpty {
            field: field.into(),
        }
    }

    /// Case-insensitive variant of a single comparison; other shapes are
    /// returned unchanged.
    #[must_use]
    pub fn insensitive(self) -> Self {
        match self {
            Self::Compare(cmp) => Self::Compare(cmp.insensitive()),
            other => other,
        }
    }

    //
    // Relations
    //

    #[must_use]
    pub fn relation(relation: impl Into<String>, quantifier: Quantifier, predicate: Self) -> Self {
        Self::Relation(RelationPredicate {
            relation: relation.into(),
            quantifier,
            predicate: Box::new(predicate),
        })
    }

    #[must_use]
    pub fn every(relation: impl Into<String>, predicate: Self) -> Self {
        Self::relation(relation, Quantifier::Every, predicate)
    }

    #[must_use]
    pub fn some(relation: impl Into<String>, predicate: Self) -> Self {
        Self::relation(relation, Quantifier::Some, predicate)
    }

    #[must_use]
    pub fn none(relation: impl Into<String>, predicate: Self) -> Self {
        Self::relation(relation, Quantifier::None, predicate)
    }

    #[must_use]
    pub fn is(relation: impl Into<String>, predicate: Self) -> Self {
        Self::relation(relation, Quantifier::Is, predicate)
    }

    #[must_use]
    pub fn is_not(relation: impl Into<String>, predicate: Self) -> Self {
        Self::relation(relation, Quantifier::IsNot, predicate)
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitAnd for &Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::And(vec![self.clone(), rhs.clone()])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

impl BitOr for &Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::Or(vec![self.clone(), rhs.clone()])
    }
}
