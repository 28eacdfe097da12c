use crate::model::field::FieldDescriptor;
use std::fmt;

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    One,
    OptionalOne,
    Many,
}

impl Cardinality {
    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(self, Self::Many)
    }

    #[must_use]
    pub const fn is_to_one(self) -> bool {
        !self.is_to_many()
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("one"),
            Self::OptionalOne => f.write_str("optional-one"),
            Self::Many => f.write_str("many"),
        }
    }
}

///
/// Ownership
///
/// Which side of a relation stores the linking keys.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Ownership {
    /// This entity stores `fields`, which reference `references` on the target.
    ForeignKey {
        fields: Vec<String>,
        references: Vec<String>,
    },

    /// Rows are linked through a join table keyed by both primary keys.
    /// `attributes` describes optional extra columns on each join row.
    JoinTable {
        table: String,
        this_column: String,
        other_column: String,
        attributes: Vec<FieldDescriptor>,
    },

    /// The target's foreign key (named by the relation's `inverse`) points here.
    Inverse,
}

///
/// RelationDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationDescriptor {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub ownership: Ownership,

    /// Name of the matching relation on the target, when declared.
    pub inverse: Option<String>,
}

impl RelationDescriptor {
    /// A relation backed by foreign-key fields stored on this entity.
    #[must_use]
    pub fn foreign_key<F, R>(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        fields: F,
        references: R,
    ) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality,
            ownership: Ownership::ForeignKey {
                fields: fields.into_iter().map(Into::into).collect(),
                references: references.into_iter().map(Into::into).collect(),
            },
            inverse: None,
        }
    }

    /// The read side of another entity's foreign key.
    #[must_use]
    pub fn inverse_of(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        inverse: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality,
            ownership: Ownership::Inverse,
            inverse: Some(inverse.into()),
        }
    }

    /// A many-to-many relation through `table`.
    #[must_use]
    pub fn join_table(
        name: impl Into<String>,
        target: impl Into<String>,
        table: impl Into<String>,
        this_column: impl Into<String>,
        other_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            ownership: Ownership::JoinTable {
                table: table.into(),
                this_column: this_column.into(),
                other_column: other_column.into(),
                attributes: Vec::new(),
            },
            inverse: None,
        }
    }

    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Declare extra join-row columns; ignored for non-join relations.
    #[must_use]
    pub fn with_join_attributes(mut self, fields: Vec<FieldDescriptor>) -> Self {
        if let Ownership::JoinTable { attributes, .. } = &mut self.ownership {
            *attributes = fields;
        }
        self
    }

    /// Join-row attributes, empty unless this is a join-table relation.
    #[must_use]
    pub fn join_attributes(&self) -> &[FieldDescriptor] {
        match &self.ownership {
            Ownership::JoinTable { attributes, .. } => attributes,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn is_join_table(&self) -> bool {
        matches!(self.ownership, Ownership::JoinTable { .. })
    }
}
