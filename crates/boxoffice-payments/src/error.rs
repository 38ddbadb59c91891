//! Error type for `boxoffice-payments`.

use boxoffice_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] boxoffice_core::Error),

  #[error("payment provider request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("payment provider rejected the request: {0}")]
  Provider(String),

  #[error("malformed provider event: {0}")]
  InvalidPayload(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::InvalidPayload(_) => ErrorKind::Validation,
      Self::Http(_) | Self::Provider(_) => ErrorKind::Infrastructure,
    }
  }
}
