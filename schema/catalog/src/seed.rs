use chrono::{DateTime, TimeZone, Utc};
use reelquery_core::{
    db::{MemoryStore, StorageError},
    value::{Record, Value},
};

fn day(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>, StorageError> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| StorageError::other(format!("invalid seed date {year}-{month}-{day}")))
}

/// Load the catalog dataset into `store`.
pub(crate) fn seed(store: &mut MemoryStore) -> Result<(), StorageError> {
    seed_people(store)?;
    seed_titles(store)?;
    seed_users(store)?;
    seed_activity(store)?;
    seed_lists(store)?;

    Ok(())
}

fn seed_people(store: &mut MemoryStore) -> Result<(), StorageError> {
    let people = [
        (1, "Harold Ramis", Some((1944, 11, 21))),
        (2, "Michael Mann", Some((1943, 2, 5))),
        (3, "Ari Aster", Some((1986, 7, 15))),
        (4, "Denis Villeneuve", Some((1967, 10, 3))),
        (5, "Bill Murray", Some((1950, 9, 21))),
        (6, "Al Pacino", Some((1940, 4, 25))),
        (7, "Amy Adams", None),
        (8, "Toni Collette", Some((1972, 11, 1))),
    ];
    for (id, name, born) in people {
        let born = match born {
            Some((y, m, d)) => Value::from(day(y, m, d)?),
            None => Value::Null,
        };
        store.insert(
            "Person",
            Record::new()
                .with("id", id)
                .with("name", name)
                .with("bornAt", born),
        )?;
    }

    Ok(())
}

fn seed_titles(store: &mut MemoryStore) -> Result<(), StorageError> {
    for (id, name) in [
        (1, "Comedy"),
        (2, "Drama"),
        (3, "Crime"),
        (4, "Horror"),
        (5, "Sci-Fi"),
    ] {
        store.insert(
            "MovieGenre",
            Record::new().with("id", id).with("name", name),
        )?;
    }

    let movies = [
        (1, "Groundhog Day", (1993, 2, 12), Some(101), Some(8.0), &["classic"][..], Some(1)),
        (2, "Heat", (1995, 12, 15), Some(170), Some(8.3), &["heist"][..], Some(2)),
        (3, "Hereditary", (2018, 6, 8), Some(127), None, &[][..], Some(3)),
        (4, "Arrival", (2016, 11, 11), None, Some(7.9), &["first-contact"][..], Some(4)),
    ];
    for (id, title, (y, m, d), runtime, rating, tags, director) in movies {
        store.insert(
            "Movie",
            Record::new()
                .with("id", id)
                .with("title", title)
                .with("releasedAt", day(y, m, d)?)
                .with("runtimeMinutes", Value::from(runtime))
                .with("rating", Value::from(rating))
                .with("tags", Value::list(tags.iter().copied()))
                .with("directorId", Value::from(director)),
        )?;
    }

    let movie_genres = [
        (1, 1, true),
        (1, 2, false),
        (2, 2, false),
        (2, 3, true),
        (3, 2, false),
        (3, 4, true),
        (4, 2, false),
        (4, 5, true),
    ];
    for (movie, genre, primary) in movie_genres {
        store.link(
            "Movie",
            "genres",
            movie,
            genre,
            Record::new().with("isPrimary", primary),
        )?;
    }

    let credits = [
        (1, 5, "Phil Connors", 1),
        (2, 6, "Vincent Hanna", 1),
        (3, 8, "Annie Graham", 1),
        (4, 7, "Louise Banks", 1),
    ];
    for (movie, person, character, billing) in credits {
        store.link(
            "Movie",
            "cast",
            movie,
            person,
            Record::new()
                .with("character", character)
                .with("billing", billing),
        )?;
    }

    let shows = [
        (1, "The Wire", (2002, 6, 2), 5, "ENDED", Some(9.3), &["baltimore"][..]),
        (2, "Severance", (2022, 2, 18), 2, "RUNNING", Some(8.7), &["office"][..]),
        (3, "Community", (2009, 9, 17), 6, "ENDED", None, &[][..]),
    ];
    for (id, title, (y, m, d), seasons, status, rating, tags) in shows {
        store.insert(
            "TvShow",
            Record::new()
                .with("id", id)
                .with("title", title)
                .with("firstAiredAt", day(y, m, d)?)
                .with("seasons", seasons)
                .with("status", Value::enum_variant(status))
                .with("rating", Value::from(rating))
                .with("tags", Value::list(tags.iter().copied())),
        )?;
    }

    for (show, genre) in [(1, 2), (1, 3), (2, 2), (2, 5), (3, 1)] {
        store.link("TvShow", "genres", show, genre, Record::new())?;
    }

    Ok(())
}

fn seed_users(store: &mut MemoryStore) -> Result<(), StorageError> {
    let users = [
        (1, "a@b.com", "Ada", Some("x"), "CRITIC", (2021, 3, 1)),
        (2, "ben@example.com", "Ben", None, "VIEWER", (2022, 8, 14)),
        (3, "cy@example.com", "Cy", Some("Lists everything"), "ADMIN", (2020, 1, 9)),
    ];
    for (id, email, name, bio, role, (y, m, d)) in users {
        store.insert(
            "User",
            Record::new()
                .with("id", id)
                .with("email", email)
                .with("name", name)
                .with("bio", Value::from(bio))
                .with("role", Value::enum_variant(role))
                .with("createdAt", day(y, m, d)?),
        )?;
    }

    let reviews = [
        (1, 5, Some("Every day a gem"), (2021, 4, 2), 1, 1),
        (2, 4, None, (2022, 9, 1), 2, 1),
        (3, 4, Some("Tense from the first frame"), (2021, 5, 20), 1, 2),
        (4, 3, None, (2020, 2, 11), 3, 3),
        (5, 5, None, (2023, 1, 7), 2, 4),
    ];
    for (id, rating, body, (y, m, d), user, movie) in reviews {
        store.insert(
            "Review",
            Record::new()
                .with("id", id)
                .with("rating", rating)
                .with("body", Value::from(body))
                .with("createdAt", day(y, m, d)?)
                .with("userId", user)
                .with("movieId", movie),
        )?;
    }

    Ok(())
}

fn seed_activity(store: &mut MemoryStore) -> Result<(), StorageError> {
    let activity = [
        (1, 1, Some(1), None, "COMPLETED", Some(100), (2021, 4, 1)),
        (2, 1, None, Some(1), "WATCHING", Some(60), (2024, 2, 3)),
        (3, 2, None, Some(2), "PLANNED", None, (2024, 5, 19)),
        (4, 3, Some(3), None, "DROPPED", Some(40), (2020, 2, 10)),
    ];
    for (id, user, movie, show, status, progress, (y, m, d)) in activity {
        store.insert(
            "WatchActivity",
            Record::new()
                .with("id", id)
                .with("userId", user)
                .with("movieId", Value::from(movie))
                .with("showId", Value::from(show))
                .with("status", Value::enum_variant(status))
                .with("progress", Value::from(progress))
                .with("updatedAt", day(y, m, d)?),
        )?;
    }

    Ok(())
}

fn seed_lists(store: &mut MemoryStore) -> Result<(), StorageError> {
    let lists = [
        (1, 1, "Comfort watches", true, (2021, 6, 1)),
        (2, 3, "To watch", false, (2020, 1, 10)),
    ];
    for (id, owner, name, public, (y, m, d)) in lists {
        store.insert(
            "List",
            Record::new()
                .with("id", id)
                .with("ownerId", owner)
                .with("name", name)
                .with("isPublic", public)
                .with("createdAt", day(y, m, d)?),
        )?;
    }

    let items = [
        (1, 1, Some(1), None, 1, Some("Perfect on repeat")),
        (2, 1, None, Some(3), 2, None),
        (3, 2, Some(4), None, 1, None),
        (4, 2, None, Some(2), 2, Some("Season two first?")),
    ];
    for (id, list, movie, show, position, note) in items {
        store.insert(
            "ListItem",
            Record::new()
                .with("id", id)
                .with("listId", list)
                .with("movieId", Value::from(movie))
                .with("showId", Value::from(show))
                .with("position", position)
                .with("note", Value::from(note)),
        )?;
    }

    Ok(())
}
