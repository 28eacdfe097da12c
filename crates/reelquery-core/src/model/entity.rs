use crate::model::{field::FieldDescriptor, relation::RelationDescriptor};
use derive_more::{Deref, IntoIterator};
use std::collections::BTreeSet;

///
/// UniqueKey
///
/// Non-empty set of field names whose combined values identify one row.
/// Field order is preserved for diagnostics only; matching is set-based.
///

#[derive(Clone, Debug, Deref, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct UniqueKey(Vec<String>);

impl UniqueKey {
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// True when `fields` names exactly this key's members.
    #[must_use]
    pub fn matches(&self, fields: &BTreeSet<&str>) -> bool {
        self.0.len() == fields.len() && self.0.iter().all(|f| fields.contains(f.as_str()))
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

///
/// EntityDescriptor
///
/// Immutable description of one entity: scalar fields in declaration order,
/// relations, and unique keys. The first unique key is the primary key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
    pub unique_keys: Vec<UniqueKey>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn with_unique_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_keys.push(UniqueKey::new(fields));
        self
    }

    //
    // Lookups
    //

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Primary key (first declared unique key).
    #[must_use]
    pub fn primary_key(&self) -> Option<&UniqueKey> {
        self.unique_keys.first()
    }

    /// Unique key whose member set equals `fields`, if any.
    #[must_use]
    pub fn unique_key_for(&self, fields: &BTreeSet<&str>) -> Option<&UniqueKey> {
        self.unique_keys.iter().find(|key| key.matches(fields))
    }

    /// Single-field primary key name, required by join-table relations.
    #[must_use]
    pub fn single_primary_key(&self) -> Option<&str> {
        match self.primary_key()?.fields() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}
