mod validate;


use crate::{
    db::middleware::{Middleware, Pipeline},
    model::{
        entity::{EntityDescriptor, UniqueKey},
        relation::{Ownership, RelationDescriptor},
    },
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// A request referenced a name the registry does not know. Lookups fail
/// closed: an unknown name never resolves to a default descriptor.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("entity '{entity}' not found in schema")]
    NotFound { entity: String },

    #[error("relation '{relation}' not found on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("relation '{relation}' on entity '{entity}' has no resolvable inverse")]
    MissingInverse { entity: String, relation: String },
}

impl SchemaError {
    pub(crate) fn not_found(entity: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
        }
    }

    pub(crate) fn unknown_relation(entity: &str, relation: &str) -> Self {
        Self::UnknownRelation {
            entity: entity.to_string(),
            relation: relation.to_string(),
        }
    }
}

///
/// SchemaBuildError
///

#[derive(Debug, ThisError)]
pub enum SchemaBuildError {
    #[error("schema validation failed: {}", issues.join("; "))]
    Invalid { issues: Vec<String> },
}

///
/// SchemaRegistry
///
/// Immutable after `build()`. Safe for unbounded concurrent reads; there is
/// no interior mutability anywhere below this type.
///

#[derive(Debug)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityDescriptor>,
    pipeline: Pipeline,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Look up an entity descriptor by name.
    pub fn describe(&self, entity: &str) -> Result<&EntityDescriptor, SchemaError> {
        self.entities
            .get(entity)
            .ok_or_else(|| SchemaError::not_found(entity))
    }

    /// Look up a relation declared on `entity`.
    pub fn resolve_relation(
        &self,
        entity: &str,
        relation: &str,
    ) -> Result<&RelationDescriptor, SchemaError> {
        self.describe(entity)?
            .relation(relation)
            .ok_or_else(|| SchemaError::unknown_relation(entity, relation))
    }

    /// Declared unique keys of `entity`, primary key first.
    pub fn unique_keys_of(&self, entity: &str) -> Result<&[UniqueKey], SchemaError> {
        Ok(&self.describe(entity)?.unique_keys)
    }

    /// Resolve the inverse side of `entity.relation` on its target.
    ///
    /// Returns `Ok(None)` for relations whose inverse is implied by the key
    /// layout (foreign-key and join-table owners without a named inverse).
    pub fn inverse_of(
        &self,
        entity: &str,
        relation: &str,
    ) -> Result<Option<&RelationDescriptor>, SchemaError> {
        let rel = self.resolve_relation(entity, relation)?;
        let target = self.describe(&rel.target)?;

        match (&rel.inverse, &rel.ownership) {
            (Some(name), _) => target.relation(name).map(Some).ok_or_else(|| {
                SchemaError::MissingInverse {
                    entity: entity.to_string(),
                    relation: relation.to_string(),
                }
            }),
            (None, Ownership::Inverse) => Err(SchemaError::MissingInverse {
                entity: entity.to_string(),
                relation: relation.to_string(),
            }),
            (None, _) => Ok(None),
        }
    }

    /// All entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    /// Middleware pipeline frozen at build time.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

///
/// SchemaRegistryBuilder
///

#[derive(Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<EntityDescriptor>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl SchemaRegistryBuilder {
    #[must_use]
    pub fn entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.push(entity);
        self
    }

    /// Append a middleware stage; stages run in registration order.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Validate every descriptor and freeze the registry.
    pub fn build(self) -> Result<SchemaRegistry, SchemaBuildError> {
        let issues = validate::validate_entities(&self.entities);
        if !issues.is_empty() {
            return Err(SchemaBuildError::Invalid { issues });
        }

        let entities = self
            .entities
            .into_iter()
            .map(|entity| (entity.name.clone(), entity))
            .collect::<BTreeMap<_, _>>();

        tracing::debug!(entities = entities.len(), "schema registry built");

        Ok(SchemaRegistry {
            entities,
            pipeline: Pipeline::new(self.middleware),
        })
    }
}
