use crate::{
    db::{memory::MemoryStore, query::predicate::Row},
    model::{EntityDescriptor, Ownership, RelationDescriptor},
    value::{Record, TextMode, Value, compare_eq},
};

///
/// StoreRow
///
/// Borrowed view of one stored row that can walk relations through the
/// store it lives in. Relation walks only ever return rows linked to this
/// row.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct StoreRow<'a> {
    pub(crate) store: &'a MemoryStore,
    pub(crate) entity: &'a EntityDescriptor,
    pub(crate) record: &'a Record,
}

impl<'a> StoreRow<'a> {
    /// Related rows together with the join row that links each of them.
    /// The join row is `None` for foreign-key relations.
    pub(crate) fn related_with_links(
        &self,
        relation: &RelationDescriptor,
    ) -> Vec<(StoreRow<'a>, Option<&'a Record>)> {
        let store = self.store;
        let Ok(target) = store.registry.describe(&relation.target) else {
            return Vec::new();
        };
        let view = |record: &'a Record| StoreRow {
            store,
            entity: target,
            record,
        };

        match &relation.ownership {
            Ownership::ForeignKey { fields, references } => store
                .rows(&target.name)
                .iter()
                .filter(|candidate| keys_match(self.record, fields, candidate, references))
                .map(|record| (view(record), None))
                .collect(),
            Ownership::Inverse => {
                let owner = relation
                    .inverse
                    .as_deref()
                    .and_then(|name| target.relation(name));
                let Some(Ownership::ForeignKey { fields, references }) =
                    owner.map(|r| &r.ownership)
                else {
                    return Vec::new();
                };

                store
                    .rows(&target.name)
                    .iter()
                    .filter(|candidate| keys_match(candidate, fields, self.record, references))
                    .map(|record| (view(record), None))
                    .collect()
            }
            Ownership::JoinTable {
                table,
                this_column,
                other_column,
                ..
            } => {
                let (Some(this_pk), Some(other_pk)) =
                    (self.entity.single_primary_key(), target.single_primary_key())
                else {
                    return Vec::new();
                };
                let Some(this_key) = self.record.value(this_pk) else {
                    return Vec::new();
                };

                store
                    .join_rows(table)
                    .iter()
                    .filter(|link| {
                        link.value(this_column)
                            .is_some_and(|v| compare_eq(v, this_key, TextMode::Cs) == Some(true))
                    })
                    .filter_map(|link| {
                        let other_key = link.value(other_column)?;
                        store
                            .rows(&target.name)
                            .iter()
                            .find(|candidate| {
                                candidate.value(other_pk).is_some_and(|v| {
                                    compare_eq(v, other_key, TextMode::Cs) == Some(true)
                                })
                            })
                            .map(|record| (view(record), Some(link)))
                    })
                    .collect()
            }
        }
    }
}

impl Row for StoreRow<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.record.value(name)
    }

    fn related(&self, relation: &str) -> Vec<Self> {
        self.entity
            .relation(relation)
            .map(|descriptor| {
                self.related_with_links(descriptor)
                    .into_iter()
                    .map(|(row, _)| row)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// `lhs[lhs_fields[i]] == rhs[rhs_fields[i]]` for every i, nulls never matching.
fn keys_match(lhs: &Record, lhs_fields: &[String], rhs: &Record, rhs_fields: &[String]) -> bool {
    lhs_fields.iter().zip(rhs_fields).all(|(l, r)| {
        match (lhs.value(l), rhs.value(r)) {
            (Some(a), Some(b)) => compare_eq(a, b, TextMode::Cs) == Some(true),
            _ => false,
        }
    })
}
