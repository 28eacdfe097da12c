//! In-memory reference storage collaborator.
//!
//! Holds entity tables and join tables as plain records and executes
//! resolved plans with the engine's own evaluation rules. Used by tests and
//! as the reference for collaborator behavior.

mod row;


use crate::{
    db::{
        query::{
            aggregate::{AggregateRow, AggregationPlan},
            predicate::{Predicate, Row, eval},
            projection::{ResolvedFetch, ResolvedPlan},
        },
        storage::{StorageCollaborator, StorageError, StorageErrorKind, StoredRow},
    },
    model::{EntityDescriptor, Ownership, SchemaRegistry},
    value::{Record, TextMode, Value, compare_eq},
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

pub(crate) use row::StoreRow;

///
/// MemoryStore
///

#[derive(Debug)]
pub struct MemoryStore {
    registry: Arc<SchemaRegistry>,
    tables: BTreeMap<String, Vec<Record>>,
    join_tables: BTreeMap<String, Vec<Record>>,
    injected: Mutex<Option<(StorageErrorKind, String)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            tables: BTreeMap::new(),
            join_tables: BTreeMap::new(),
            injected: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Insert one row, enforcing field presence, nullability and every
    /// declared unique key.
    pub fn insert(&mut self, entity: &str, record: Record) -> Result<(), StorageError> {
        let descriptor = self
            .registry
            .describe(entity)
            .map_err(|err| StorageError::other(err.to_string()))?;

        let mut row = Record::new();
        for field in &descriptor.fields {
            let value = record.value(&field.name).cloned().unwrap_or(Value::Null);
            if value.is_null() && !field.nullable {
                return Err(StorageError::constraint(format!(
                    "'{entity}.{}' is required",
                    field.name
                )));
            }
            if !value.is_null() && !field.kind.matches_literal(&value) {
                return Err(StorageError::constraint(format!(
                    "'{entity}.{}' expects {}, got {}",
                    field.name,
                    field.kind,
                    value.kind_label()
                )));
            }
            row.insert(field.name.clone(), value);
        }
        if let Some(unknown) = record.keys().find(|k| descriptor.field(k).is_none()) {
            return Err(StorageError::constraint(format!("'{entity}' has no field '{unknown}'")));
        }

        let existing = self.tables.get(entity).map_or(&[][..], Vec::as_slice);
        for key in &descriptor.unique_keys {
            if existing
                .iter()
                .any(|other| same_on(key.fields(), other, &row))
            {
                return Err(StorageError::constraint(format!(
                    "unique key {:?} on '{entity}' already holds these values",
                    key.fields()
                )));
            }
        }

        self.tables.entry(entity.to_string()).or_default().push(row);

        Ok(())
    }

    /// Link two rows through a join-table relation declared on `entity`.
    pub fn link(
        &mut self,
        entity: &str,
        relation: &str,
        this_key: impl Into<Value>,
        other_key: impl Into<Value>,
        attributes: Record,
    ) -> Result<(), StorageError> {
        let descriptor = self
            .registry
            .resolve_relation(entity, relation)
            .map_err(|err| StorageError::other(err.to_string()))?;
        let Ownership::JoinTable {
            table,
            this_column,
            other_column,
            attributes: declared,
        } = &descriptor.ownership
        else {
            return Err(StorageError::other(format!(
                "'{entity}.{relation}' is not a join-table relation"
            )));
        };

        let mut row = Record::new()
            .with(this_column.clone(), this_key)
            .with(other_column.clone(), other_key);
        for attribute in declared {
            let value = attributes
                .value(&attribute.name)
                .cloned()
                .unwrap_or(Value::Null);
            if value.is_null() && !attribute.nullable {
                return Err(StorageError::constraint(format!(
                    "join attribute '{table}.{}' is required",
                    attribute.name
                )));
            }
            row.insert(attribute.name.clone(), value);
        }

        let links = self.join_tables.entry(table.clone()).or_default();
        let pair = [this_column.clone(), other_column.clone()];
        if links.iter().any(|other| same_on(&pair, other, &row)) {
            return Err(StorageError::constraint(format!("'{table}' already links these rows")));
        }
        links.push(row);

        Ok(())
    }

    /// Make the next storage call fail with the given kind.
    pub fn fail_next(&self, kind: StorageErrorKind, message: impl Into<String>) {
        let mut injected = self.injected.lock().unwrap_or_else(PoisonError::into_inner);
        *injected = Some((kind, message.into()));
    }

    fn take_injected(&self) -> Result<(), StorageError> {
        let injected = self
            .injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match injected {
            Some((kind, message)) => Err(StorageError::new(kind, message)),
            None => Ok(()),
        }
    }

    pub(crate) fn rows(&self, entity: &str) -> &[Record] {
        self.tables.get(entity).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn join_rows(&self, table: &str) -> &[Record] {
        self.join_tables.get(table).map_or(&[][..], Vec::as_slice)
    }

    fn root_rows<'a>(&'a self, entity: &'a EntityDescriptor) -> Vec<StoreRow<'a>> {
        self.rows(&entity.name)
            .iter()
            .map(|record| StoreRow {
                store: self,
                entity,
                record,
            })
            .collect()
    }

    // Build the stored row for one parent: full fields, then each relation
    // resolved against this parent only.
    fn materialize(&self, row: StoreRow<'_>, plan: &ResolvedPlan) -> StoredRow {
        let mut stored = StoredRow::new(row.record.clone());

        for resolved in &plan.relations {
            let fetch = &resolved.fetch;
            let linked = row.related_with_links(&resolved.relation);
            let scope = linked.iter().map(|(related, _)| *related).collect::<Vec<_>>();
            let candidates = linked
                .into_iter()
                .filter(|(_, link)| join_passes(fetch.join_predicate.as_ref(), *link))
                .map(|(related, _)| related)
                .filter(|related| eval(related, &fetch.predicate))
                .collect::<Vec<_>>();
            let windowed = fetch.window.apply_within(candidates, &scope);

            stored.relations.insert(
                resolved.relation.name.clone(),
                windowed
                    .into_iter()
                    .map(|related| self.materialize(related, &fetch.plan))
                    .collect(),
            );
        }

        for count in &plan.counts {
            let n = row
                .related(&count.relation)
                .iter()
                .filter(|related| eval(*related, &count.predicate))
                .count();
            stored
                .counts
                .insert(count.relation.clone(), u64::try_from(n).unwrap_or(u64::MAX));
        }

        stored
    }
}

impl StorageCollaborator for MemoryStore {
    fn fetch(&self, fetch: &ResolvedFetch) -> Result<Vec<StoredRow>, StorageError> {
        self.take_injected()?;

        let entity = self
            .registry
            .describe(&fetch.plan.entity)
            .map_err(|err| StorageError::other(err.to_string()))?;
        let scope = self.root_rows(entity);
        let matching = scope
            .iter()
            .copied()
            .filter(|row| eval(row, &fetch.predicate))
            .collect::<Vec<_>>();
        let windowed = fetch.window.apply_within(matching, &scope);

        tracing::trace!(entity = %entity.name, rows = windowed.len(), "memory fetch");

        Ok(windowed
            .into_iter()
            .map(|row| self.materialize(row, &fetch.plan))
            .collect())
    }

    fn aggregate(&self, plan: &AggregationPlan) -> Result<Vec<AggregateRow>, StorageError> {
        self.take_injected()?;

        let entity = self
            .registry
            .describe(&plan.entity)
            .map_err(|err| StorageError::other(err.to_string()))?;

        Ok(plan.evaluate(self.root_rows(entity)))
    }
}

fn join_passes(predicate: Option<&Predicate>, link: Option<&Record>) -> bool {
    match (predicate, link) {
        (None, _) => true,
        (Some(predicate), Some(link)) => eval(&link, predicate),
        (Some(_), None) => false,
    }
}

// Rows agree on every named field, nulls never agreeing.
fn same_on(fields: &[String], lhs: &Record, rhs: &Record) -> bool {
    fields.iter().all(|field| match (lhs.value(field), rhs.value(field)) {
        (Some(a), Some(b)) => compare_eq(a, b, TextMode::Cs) == Some(true),
        _ => false,
    })
}
