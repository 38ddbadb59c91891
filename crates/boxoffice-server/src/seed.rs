//! Loading a catalog of movies, halls and sessions from JSON.
//!
//! ```json
//! {
//!   "movies":   [{ "title": "Stalker" }],
//!   "halls":    [{ "name": "Hall 1", "rows": 8, "seats_per_row": 12 }],
//!   "sessions": [{ "movie": "Stalker", "hall": "Hall 1",
//!                  "starts_at": "2025-05-01T19:30:00Z", "price": 1250 }]
//! }
//! ```
//!
//! Sessions refer to movies by title and halls by name. `price` is in minor
//! currency units.

use std::{collections::HashMap, path::Path};

use boxoffice_core::{
  catalog::{HallId, MovieId},
  money::Money,
};
use boxoffice_store_sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct Catalog {
  #[serde(default)]
  pub movies:   Vec<MovieSeed>,
  #[serde(default)]
  pub halls:    Vec<HallSeed>,
  #[serde(default)]
  pub sessions: Vec<SessionSeed>,
}

#[derive(Debug, Deserialize)]
pub struct MovieSeed {
  pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct HallSeed {
  pub name:          String,
  pub rows:          u32,
  pub seats_per_row: u32,
}

#[derive(Debug, Deserialize)]
pub struct SessionSeed {
  pub movie:     String,
  pub hall:      String,
  pub starts_at: DateTime<Utc>,
  pub price:     Money,
}

/// Counts of what [`load`] inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Seeded {
  pub movies:   usize,
  pub halls:    usize,
  pub seats:    usize,
  pub sessions: usize,
}

impl Catalog {
  pub async fn from_path(path: &Path) -> Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}

/// Insert `catalog` into `store`.
pub async fn load(store: &SqliteStore, catalog: Catalog) -> Result<Seeded> {
  let mut seeded = Seeded::default();

  let mut movies: HashMap<String, MovieId> = HashMap::new();
  for movie in catalog.movies {
    let id = store.add_movie(movie.title.clone()).await?;
    movies.insert(movie.title, id);
    seeded.movies += 1;
  }

  let mut halls: HashMap<String, HallId> = HashMap::new();
  for hall in catalog.halls {
    let (id, seats) = store
      .add_hall(hall.name.clone(), hall.rows, hall.seats_per_row)
      .await?;
    halls.insert(hall.name, id);
    seeded.halls += 1;
    seeded.seats += seats.len();
  }

  for session in catalog.sessions {
    let movie_id = *movies
      .get(&session.movie)
      .ok_or_else(|| Error::UnknownMovie(session.movie.clone()))?;
    let hall_id = *halls
      .get(&session.hall)
      .ok_or_else(|| Error::UnknownHall(session.hall.clone()))?;
    store
      .add_session(movie_id, hall_id, session.starts_at, session.price)
      .await?;
    seeded.sessions += 1;
  }

  Ok(seeded)
}

#[cfg(test)]
mod tests {
  use boxoffice_core::store::BookingLedger as _;

  use super::*;

  const CATALOG: &str = r#"{
    "movies": [{ "title": "Stalker" }, { "title": "Solaris" }],
    "halls": [{ "name": "Hall 1", "rows": 2, "seats_per_row": 3 }],
    "sessions": [
      { "movie": "Stalker", "hall": "Hall 1", "starts_at": "2025-05-01T19:30:00Z", "price": 1250 },
      { "movie": "Solaris", "hall": "Hall 1", "starts_at": "2025-05-01T22:00:00Z", "price": 1100 }
    ]
  }"#;

  #[tokio::test]
  async fn loads_catalog_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    tokio::fs::write(&path, CATALOG).await.unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let catalog = Catalog::from_path(&path).await.unwrap();
    let seeded = load(&store, catalog).await.unwrap();
    assert_eq!(seeded, Seeded { movies: 2, halls: 1, seats: 6, sessions: 2 });
    assert!(!store.catalog_is_empty().await.unwrap());

    let seats = store.session_occupancy(1).await.unwrap();
    assert_eq!(seats.len(), 6);
  }

  #[tokio::test]
  async fn unknown_references_are_reported() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let catalog: Catalog = serde_json::from_str(
      r#"{ "sessions": [{ "movie": "Nope", "hall": "X",
           "starts_at": "2025-05-01T19:30:00Z", "price": 100 }] }"#,
    )
    .unwrap();
    assert!(matches!(
      load(&store, catalog).await,
      Err(Error::UnknownMovie(m)) if m == "Nope"
    ));
  }
}
