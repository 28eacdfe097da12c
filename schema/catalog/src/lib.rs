//! Media-catalog schema and seed data shared by reelquery's integration
//! tests: users, people, movies, TV shows, genres, reviews, watch activity
//! and lists.

mod entity;
mod seed;


use reelquery_core::{
    db::{MemoryStore, StorageError},
    model::{SchemaBuildError, SchemaRegistry, SchemaRegistryBuilder},
};
use std::sync::Arc;

/// Entity names, in registration order.
pub const ENTITIES: [&str; 9] = [
    "User",
    "Person",
    "Movie",
    "TvShow",
    "MovieGenre",
    "Review",
    "WatchActivity",
    "List",
    "ListItem",
];

/// Builder with every catalog entity registered. Add middleware before
/// calling `build`.
#[must_use]
pub fn builder() -> SchemaRegistryBuilder {
    entity::all()
        .into_iter()
        .fold(SchemaRegistry::builder(), SchemaRegistryBuilder::entity)
}

pub fn registry() -> Result<SchemaRegistry, SchemaBuildError> {
    builder().build()
}

///
/// Seeded store
///
/// Dataset highlights:
/// - Groundhog Day is the only Comedy; it is also a Drama.
/// - Heat is Drama and Crime; Hereditary has no rating.
/// - User `a@b.com` has bio `"x"`.
/// - Every movie has one cast credit and a director.
///

pub fn seeded_store(registry: Arc<SchemaRegistry>) -> Result<MemoryStore, StorageError> {
    let mut store = MemoryStore::new(registry);
    seed::seed(&mut store)?;

    Ok(store)
}
