//! Error type for catalog seeding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid catalog: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Store(#[from] boxoffice_store_sqlite::Error),

  #[error("session refers to unknown movie {0:?}")]
  UnknownMovie(String),

  #[error("session refers to unknown hall {0:?}")]
  UnknownHall(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
