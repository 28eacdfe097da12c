use reelquery_core::model::{
    Cardinality, EntityDescriptor, FieldDescriptor, RelationDescriptor, ScalarKind,
};

//
// Enums
//

fn role() -> ScalarKind {
    ScalarKind::enumeration("Role", ["VIEWER", "CRITIC", "ADMIN"])
}

fn show_status() -> ScalarKind {
    ScalarKind::enumeration("ShowStatus", ["RUNNING", "ENDED", "CANCELLED"])
}

fn watch_status() -> ScalarKind {
    ScalarKind::enumeration(
        "WatchStatus",
        ["PLANNED", "WATCHING", "COMPLETED", "DROPPED"],
    )
}

//
// Join-row attributes
//

fn genre_link() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::optional("isPrimary", ScalarKind::Boolean)]
}

fn cast_credit() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::optional("character", ScalarKind::Text),
        FieldDescriptor::optional("billing", ScalarKind::Int),
    ]
}

//
// Accounts
//

pub(crate) fn user() -> EntityDescriptor {
    EntityDescriptor::new("User")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("email", ScalarKind::Text))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_field(FieldDescriptor::optional("bio", ScalarKind::Text))
        .with_field(FieldDescriptor::required("role", role()))
        .with_field(FieldDescriptor::required("createdAt", ScalarKind::DateTime))
        .with_relation(RelationDescriptor::inverse_of(
            "reviews",
            "Review",
            Cardinality::Many,
            "author",
        ))
        .with_relation(RelationDescriptor::inverse_of(
            "activity",
            "WatchActivity",
            Cardinality::Many,
            "user",
        ))
        .with_relation(RelationDescriptor::inverse_of("lists", "List", Cardinality::Many, "owner"))
        .with_unique_key(["id"])
        .with_unique_key(["email"])
}

//
// Catalog
//

pub(crate) fn person() -> EntityDescriptor {
    EntityDescriptor::new("Person")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_field(FieldDescriptor::optional("bornAt", ScalarKind::DateTime))
        .with_relation(RelationDescriptor::inverse_of(
            "directed",
            "Movie",
            Cardinality::Many,
            "director",
        ))
        .with_relation(
            RelationDescriptor::join_table(
                "filmography",
                "Movie",
                "_MovieCast",
                "personId",
                "movieId",
            )
            .with_inverse("cast")
            .with_join_attributes(cast_credit()),
        )
        .with_unique_key(["id"])
}

pub(crate) fn movie() -> EntityDescriptor {
    EntityDescriptor::new("Movie")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("title", ScalarKind::Text))
        .with_field(FieldDescriptor::required("releasedAt", ScalarKind::DateTime))
        .with_field(FieldDescriptor::optional("runtimeMinutes", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("rating", ScalarKind::Float))
        .with_field(FieldDescriptor::required("tags", ScalarKind::TextList))
        .with_field(FieldDescriptor::optional("directorId", ScalarKind::Int))
        .with_relation(
            RelationDescriptor::foreign_key(
                "director",
                "Person",
                Cardinality::OptionalOne,
                ["directorId"],
                ["id"],
            )
            .with_inverse("directed"),
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
            .with_join_attributes(genre_link()),
        )
        .with_relation(
            RelationDescriptor::join_table("cast", "Person", "_MovieCast", "movieId", "personId")
                .with_inverse("filmography")
                .with_join_attributes(cast_credit()),
        )
        .with_relation(RelationDescriptor::inverse_of(
            "reviews",
            "Review",
            Cardinality::Many,
            "movie",
        ))
        .with_relation(RelationDescriptor::inverse_of(
            "activity",
            "WatchActivity",
            Cardinality::Many,
            "movie",
        ))
        .with_relation(RelationDescriptor::inverse_of(
            "listItems",
            "ListItem",
            Cardinality::Many,
            "movie",
        ))
        .with_unique_key(["id"])
        .with_unique_key(["title", "releasedAt"])
}

pub(crate) fn tv_show() -> EntityDescriptor {
    EntityDescriptor::new("TvShow")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("title", ScalarKind::Text))
        .with_field(FieldDescriptor::required("firstAiredAt", ScalarKind::DateTime))
        .with_field(FieldDescriptor::required("seasons", ScalarKind::Int))
        .with_field(FieldDescriptor::required("status", show_status()))
        .with_field(FieldDescriptor::optional("rating", ScalarKind::Float))
        .with_field(FieldDescriptor::required("tags", ScalarKind::TextList))
        .with_relation(
            RelationDescriptor::join_table(
                "genres",
                "MovieGenre",
                "_ShowGenres",
                "showId",
                "genreId",
            )
            .with_inverse("shows"),
        )
        .with_relation(RelationDescriptor::inverse_of(
            "activity",
            "WatchActivity",
            Cardinality::Many,
            "show",
        ))
        .with_relation(RelationDescriptor::inverse_of(
            "listItems",
            "ListItem",
            Cardinality::Many,
            "show",
        ))
        .with_unique_key(["id"])
}

/// Genres are shared by movies and shows.
pub(crate) fn movie_genre() -> EntityDescriptor {
    EntityDescriptor::new("MovieGenre")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_relation(
            RelationDescriptor::join_table("movies", "Movie", "_MovieGenres", "genreId", "movieId")
                .with_inverse("genres")
                .with_join_attributes(genre_link()),
        )
        .with_relation(
            RelationDescriptor::join_table("shows", "TvShow", "_ShowGenres", "genreId", "showId")
                .with_inverse("genres"),
        )
        .with_unique_key(["id"])
        .with_unique_key(["name"])
}

//
// Social
//

pub(crate) fn review() -> EntityDescriptor {
    EntityDescriptor::new("Review")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("rating", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("body", ScalarKind::Text))
        .with_field(FieldDescriptor::required("createdAt", ScalarKind::DateTime))
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

/// One viewing record; points at a movie or a show.
pub(crate) fn watch_activity() -> EntityDescriptor {
    EntityDescriptor::new("WatchActivity")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("userId", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("movieId", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("showId", ScalarKind::Int))
        .with_field(FieldDescriptor::required("status", watch_status()))
        .with_field(FieldDescriptor::optional("progress", ScalarKind::Int))
        .with_field(FieldDescriptor::required("updatedAt", ScalarKind::DateTime))
        .with_relation(
            RelationDescriptor::foreign_key("user", "User", Cardinality::One, ["userId"], ["id"])
                .with_inverse("activity"),
        )
        .with_relation(
            RelationDescriptor::foreign_key(
                "movie",
                "Movie",
                Cardinality::OptionalOne,
                ["movieId"],
                ["id"],
            )
            .with_inverse("activity"),
        )
        .with_relation(
            RelationDescriptor::foreign_key(
                "show",
                "TvShow",
                Cardinality::OptionalOne,
                ["showId"],
                ["id"],
            )
            .with_inverse("activity"),
        )
        .with_unique_key(["id"])
}

pub(crate) fn list() -> EntityDescriptor {
    EntityDescriptor::new("List")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("ownerId", ScalarKind::Int))
        .with_field(FieldDescriptor::required("name", ScalarKind::Text))
        .with_field(FieldDescriptor::required("isPublic", ScalarKind::Boolean))
        .with_field(FieldDescriptor::required("createdAt", ScalarKind::DateTime))
        .with_relation(
            RelationDescriptor::foreign_key("owner", "User", Cardinality::One, ["ownerId"], ["id"])
                .with_inverse("lists"),
        )
        .with_relation(RelationDescriptor::inverse_of(
            "items",
            "ListItem",
            Cardinality::Many,
            "list",
        ))
        .with_unique_key(["id"])
        .with_unique_key(["ownerId", "name"])
}

pub(crate) fn list_item() -> EntityDescriptor {
    EntityDescriptor::new("ListItem")
        .with_field(FieldDescriptor::required("id", ScalarKind::Int))
        .with_field(FieldDescriptor::required("listId", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("movieId", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("showId", ScalarKind::Int))
        .with_field(FieldDescriptor::required("position", ScalarKind::Int))
        .with_field(FieldDescriptor::optional("note", ScalarKind::Text))
        .with_relation(
            RelationDescriptor::foreign_key("list", "List", Cardinality::One, ["listId"], ["id"])
                .with_inverse("items"),
        )
        .with_relation(
            RelationDescriptor::foreign_key(
                "movie",
                "Movie",
                Cardinality::OptionalOne,
                ["movieId"],
                ["id"],
            )
            .with_inverse("listItems"),
        )
        .with_relation(
            RelationDescriptor::foreign_key(
                "show",
                "TvShow",
                Cardinality::OptionalOne,
                ["showId"],
                ["id"],
            )
            .with_inverse("listItems"),
        )
        .with_unique_key(["id"])
        .with_unique_key(["listId", "position"])
}

/// Every catalog entity, in registration order.
pub(crate) fn all() -> [EntityDescriptor; 9] {
    [
        user(),
        person(),
        movie(),
        tv_show(),
        movie_genre(),
        review(),
        watch_activity(),
        list(),
        list_item(),
    ]
}
