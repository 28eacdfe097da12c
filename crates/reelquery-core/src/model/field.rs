use crate::value::Value;
use std::fmt;

///
/// ScalarKind
///
/// Scalar type surface understood by validation, ordering and aggregation.
/// Decides operator legality and literal compatibility only.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Boolean,
    DateTime,
    Enum { name: String, variants: Vec<String> },
    Float,
    Int,
    Text,
    TextList,
}

impl ScalarKind {
    /// Build an enum kind from its declared variants.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::TextList)
    }

    /// Range comparisons (`lt`, `lte`, `gt`, `gte`) and `min`/`max`.
    #[must_use]
    pub const fn supports_range(&self) -> bool {
        matches!(self, Self::Text | Self::Int | Self::Float | Self::DateTime)
    }

    /// Usable as an ORDER BY key.
    #[must_use]
    pub const fn is_sortable(&self) -> bool {
        !self.is_list()
    }

    /// True when a non-null literal is a valid value for this kind.
    #[must_use]
    pub fn matches_literal(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Boolean, Value::Bool(_))
            | (Self::DateTime, Value::Timestamp(_))
            | (Self::Float, Value::Int(_) | Value::Float(_))
            | (Self::Int, Value::Int(_))
            | (Self::Text, Value::Text(_)) => true,
            (Self::Enum { variants, .. }, Value::Enum(v) | Value::Text(v)) => {
                variants.iter().any(|declared| declared == v)
            }
            (Self::TextList, Value::List(items)) => {
                items.iter().all(|item| matches!(item, Value::Text(_)))
            }
            _ => false,
        }
    }

    /// True when `value` is a valid element of this list kind.
    #[must_use]
    pub const fn matches_element(&self, value: &Value) -> bool {
        matches!((self, value), (Self::TextList, Value::Text(_)))
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::DateTime => f.write_str("datetime"),
            Self::Enum { name, .. } => write!(f, "enum {name}"),
            Self::Float => f.write_str("float"),
            Self::Int => f.write_str("int"),
            Self::Text => f.write_str("text"),
            Self::TextList => f.write_str("text[]"),
        }
    }
}

///
/// FieldDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }
}
