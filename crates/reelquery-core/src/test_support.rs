//! Small media schema and seeded store shared by unit tests.

use crate::{
    db::{MemoryStore, memory::StoreRow},
    model::{
        Cardinality, EntityDescriptor, FieldDescriptor, RelationDescriptor, ScalarKind,
        SchemaRegistry,
    },
    value::{Record, Value},
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub(crate) fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

fn role() -> ScalarKind {
    ScalarKind::enumeration("Role", ["VIEWER", "CRITIC", "ADMIN"])
}

fn genre_link_attributes() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::optional("isPrimary", ScalarKind::Boolean)]
}

pub(crate) fn user() -> EntityDescriptor {
    EntityDescriptor::new("User")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("email", ScalarKind::Text))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_field(FieldDescriptor::optional("bio", ScalarKind::Text))
        .with_field(FieldDescriptor::required("role", role()))
        .with_relation(RelationDescriptor::inverse_of(
            "curated",
            "Movie",
            Cardinality::Many,
            "curator",
        ))
        .with_relation(RelationDescriptor::inverse_of(
            "reviews",
            "Review",
            Cardinality::Many,
            "author",
        ))
        .with_unique_key(["id"])
        .with_unique_key(["email"])
}

pub(crate) fn movie() -> EntityDescriptor {
    EntityDescriptor::new("Movie")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("title", ScalarKind::Text))
        .with_field(FieldDescriptor::required("releasedAt", ScalarKind::DateTime))
        .with_field(FieldDescriptor::optional("rating", ScalarKind::Float))
        .with_field(FieldDescriptor::required("tags", ScalarKind::TextList))
        .with_field(FieldDescriptor::optional("curatorId", ScalarKind::Int))
        .with_relation(
            RelationDescriptor::foreign_key(
                "curator",
                "User",
                Cardinality::OptionalOne,
                ["curatorId"],
                ["id"],
            )
            .with_inverse("curated"),
        )
        .with_relation(
            RelationDescriptor::join_table(
                "genres",
                "MovieGenre",
                "_MovieGenres",
                "movieId",
                "genreId",
            )
            .with_inverse("movies")
            .with_join_attributes(genre_link_attributes()),
        )
        .with_relation(RelationDescriptor::inverse_of(
            "reviews",
            "Review",
            Cardinality::Many,
            "movie",
        ))
        .with_unique_key(["id"])
}

pub(crate) fn movie_genre() -> EntityDescriptor {
    EntityDescriptor::new("MovieGenre")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_relation(
            RelationDescriptor::join_table("movies", "Movie", "_MovieGenres", "genreId", "movieId")
                .with_inverse("genres")
                .with_join_attributes(genre_link_attributes()),
        )
        .with_unique_key(["id"])
        .with_unique_key(["name"])
}

pub(crate) fn review() -> EntityDescriptor {
    EntityDescriptor::new("Review")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("rating", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("body", ScalarKind::Text))
        .with_field(FieldDescriptor::required("userId", ScalarKind::Int))
        .with_field(FieldDescriptor::required("movieId", ScalarKind::Int))
        .with_relation(
            RelationDescriptor::foreign_key("author", "User", Cardinality::One, ["userId"], ["id"])
                .with_inverse("reviews"),
        )
        .with_relation(
            RelationDescriptor::foreign_key("movie", "Movie", Cardinality::One, ["movieId"], ["id"])
                .with_inverse("reviews"),
        )
        .with_unique_key(["id"])
        .with_unique_key(["userId", "movieId"])
}

pub(crate) fn registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .entity(user())
        .entity(movie())
        .entity(movie_genre())
        .entity(review())
        .build()
        .expect("test schema is valid")
}

pub(crate) fn shared_registry() -> Arc<SchemaRegistry> {
    Arc::new(registry())
}

/// Three users, five movies, three genres, six reviews.
///
/// Comedy: Airplane!, Groundhog Day, Paddington 2.
/// Drama: Groundhog Day, Heat, Paddington 2.
/// Horror: Hereditary.
pub(crate) fn seeded_store() -> MemoryStore {
    seed(MemoryStore::new(shared_registry()))
}

pub(crate) fn seed(mut store: MemoryStore) -> MemoryStore {
    let users = [
        (1, "alice@example.com", "Alice", Some("Film buff"), "CRITIC"),
        (2, "bob@example.com", "Bob", None, "VIEWER"),
        (3, "carol@example.com", "Carol", Some("Curator"), "ADMIN"),
    ];
    for (id, email, name, bio, role) in users {
        let bio = bio.map_or(Value::Null, Value::from);
        store
            .insert(
                "User",
                Record::new()
                    .with("id", id)
                    .with("email", email)
                    .with("name", name)
                    .with("bio", bio)
                    .with("role", Value::enum_variant(role)),
            )
            .expect("insert user");
    }

    for (id, name) in [(1, "Comedy"), (2, "Drama"), (3, "Horror")] {
        store
            .insert(
                "MovieGenre",
                Record::new().with("id", id).with("name", name),
            )
            .expect("insert genre");
    }

    let movies: [(i64, &str, DateTime<Utc>, Option<f64>, &[&str], Option<i64>); 5] = [
        (1, "Airplane!", date(1980, 7, 2), Some(7.7), &["spoof", "classic"], Some(3)),
        (2, "Groundhog Day", date(1993, 2, 12), Some(8.0), &["classic"], Some(3)),
        (3, "Heat", date(1995, 12, 15), Some(8.3), &["crime"], Some(1)),
        (4, "Hereditary", date(2018, 6, 8), None, &[], None),
        (5, "Paddington 2", date(2017, 11, 10), Some(7.8), &["family"], Some(1)),
    ];
    for (id, title, released, rating, tags, curator) in movies {
        store
            .insert(
                "Movie",
                Record::new()
                    .with("id", id)
                    .with("title", title)
                    .with("releasedAt", released)
                    .with("rating", rating.map_or(Value::Null, Value::from))
                    .with("tags", Value::list(tags.iter().copied()))
                    .with("curatorId", curator.map_or(Value::Null, Value::from)),
            )
            .expect("insert movie");
    }

    let links = [
        (1, 1, true),
        (2, 1, true),
        (2, 2, false),
        (3, 2, true),
        (4, 3, true),
        (5, 1, true),
        (5, 2, false),
    ];
    for (movie, genre, primary) in links {
        store
            .link(
                "Movie",
                "genres",
                movie,
                genre,
                Record::new().with("isPrimary", primary),
            )
            .expect("link genre");
    }

    let reviews = [
        (1, 5, Some("Surely the best"), 1, 1),
        (2, 4, None, 2, 1),
        (3, 5, Some("Again and again"), 1, 2),
        (4, 3, None, 2, 3),
        (5, 2, Some("Too scary"), 3, 4),
        (6, 4, None, 1, 5),
    ];
    for (id, rating, body, user, movie) in reviews {
        store
            .insert(
                "Review",
                Record::new()
                    .with("id", id)
                    .with("rating", rating)
                    .with("body", body.map_or(Value::Null, Value::from))
                    .with("userId", user)
                    .with("movieId", movie),
            )
            .expect("insert review");
    }

    store
}

/// Every stored row of `entity`, as rows that can walk relations.
pub(crate) fn rows_of<'a>(store: &'a MemoryStore, entity: &str) -> Vec<StoreRow<'a>> {
    let descriptor = store.registry().describe(entity).expect("entity exists");

    store
        .rows(entity)
        .iter()
        .map(|record| StoreRow {
            store,
            entity: descriptor,
            record,
        })
        .collect()
}
