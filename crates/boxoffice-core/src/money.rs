//! Fixed-point monetary amounts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount in minor currency units (cents).
///
/// Serialised as a plain integer so no precision is lost over the wire.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
  pub const fn from_minor(minor: i64) -> Self { Self(minor) }

  pub const fn minor(self) -> i64 { self.0 }

  /// `self * quantity`, or `None` on overflow.
  pub fn times(self, quantity: usize) -> Option<Self> {
    i64::try_from(quantity)
      .ok()
      .and_then(|q| self.0.checked_mul(q))
      .map(Self)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
  }
}
