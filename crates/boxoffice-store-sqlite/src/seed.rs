//! Catalog writes.
//!
//! The ledger only ever reads the catalog; these inherent methods exist so
//! an operator (or a test) can load movies, halls and sessions into the same
//! database.

use boxoffice_core::{
  catalog::{HallId, MovieId, Seat, Session},
  money::Money,
  store::CatalogStore as _,
};
use chrono::{DateTime, Utc};

use crate::{Error, Result, SqliteStore, encode::encode_dt};

impl SqliteStore {
  /// `true` until the first movie is added.
  pub async fn catalog_is_empty(&self) -> Result<bool> {
    self
      .call(|conn| {
        let any: bool = conn.query_row(
          "SELECT EXISTS (SELECT 1 FROM movies)",
          [],
          |row| row.get(0),
        )?;
        Ok(!any)
      })
      .await
  }

  pub async fn add_movie(&self, title: impl Into<String>) -> Result<MovieId> {
    let title = title.into();
    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO movies (title) VALUES (?1)",
          rusqlite::params![title],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
  }

  /// Create a hall with `rows × seats_per_row` seats numbered from 1.
  pub async fn add_hall(
    &self,
    name: impl Into<String>,
    rows: u32,
    seats_per_row: u32,
  ) -> Result<(HallId, Vec<Seat>)> {
    let name = name.into();
    self
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO halls (name) VALUES (?1)", rusqlite::params![
          name
        ])?;
        let hall_id = tx.last_insert_rowid();

        let mut seats =
          Vec::with_capacity(rows as usize * seats_per_row as usize);
        {
          let mut stmt = tx.prepare(
            "INSERT INTO seats (hall_id, row_number, seat_number)
             VALUES (?1, ?2, ?3)",
          )?;
          for row in 1..=rows {
            for number in 1..=seats_per_row {
              stmt.execute(rusqlite::params![hall_id, row, number])?;
              seats.push(Seat {
                seat_id: tx.last_insert_rowid(),
                hall_id,
                row,
                number,
              });
            }
          }
        }
        tx.commit()?;
        Ok((hall_id, seats))
      })
      .await
  }

  pub async fn add_session(
    &self,
    movie_id: MovieId,
    hall_id: HallId,
    starts_at: DateTime<Utc>,
    price: Money,
  ) -> Result<Session> {
    if price.minor() <= 0 {
      return Err(Error::Core(boxoffice_core::Error::Validation(
        "session price must be positive".into(),
      )));
    }

    let starts = encode_dt(starts_at);
    let session_id = self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (movie_id, hall_id, starts_at, price_minor)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![movie_id, hall_id, starts, price.minor()],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(session_id, movie_id, hall_id, "session added");

    self.get_session(session_id).await?.ok_or_else(|| {
      Error::Core(boxoffice_core::Error::SessionNotFound(session_id))
    })
  }
}
