//! Webhook signature verification.
//!
//! The provider sends `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! Each `v1` is an HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! endpoint's signing secret. Any one matching `v1` accepts the payload,
//! which lets the provider roll secrets without downtime.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Name of the HTTP header carrying the signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Default maximum distance between the signed timestamp and now.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
  #[error("signature header is missing")]
  Missing,
  #[error("signature header is malformed")]
  Malformed,
  #[error("signature timestamp is outside the tolerance window")]
  Stale,
  #[error("no signature matches the payload")]
  Mismatch,
  #[error("signing secret is empty")]
  EmptySecret,
}

/// Checks provider signatures against one signing secret.
#[derive(Clone)]
pub struct SignatureVerifier {
  keyed:     HmacSha256,
  tolerance: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SignatureVerifier")
      .field("tolerance", &self.tolerance)
      .finish_non_exhaustive()
  }
}

impl SignatureVerifier {
  pub fn new(
    secret: impl AsRef<[u8]>,
    tolerance: Duration,
  ) -> Result<Self, SignatureError> {
    let secret = secret.as_ref();
    if secret.is_empty() {
      return Err(SignatureError::EmptySecret);
    }
    let keyed = HmacSha256::new_from_slice(secret)
      .map_err(|_| SignatureError::EmptySecret)?;
    Ok(Self { keyed, tolerance })
  }

  fn mac(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac = self.keyed.clone();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
  }

  /// Produce a header value for `payload` signed at `timestamp`.
  pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
    let digest = self.mac(timestamp, payload).finalize().into_bytes();
    format!("t={timestamp},v1={}", hex::encode(digest))
  }

  /// Verify `header` against `payload` as of `now`.
  pub fn verify(
    &self,
    payload: &[u8],
    header: Option<&str>,
    now: DateTime<Utc>,
  ) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
      let Some((key, value)) = part.trim().split_once('=') else {
        return Err(SignatureError::Malformed);
      };
      match key {
        "t" => {
          timestamp =
            Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?)
        }
        "v1" => candidates.push(value),
        // v0 and future schemes are ignored.
        _ => {}
      }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
      return Err(SignatureError::Malformed);
    }

    let skew = now.timestamp().abs_diff(timestamp);
    if skew > self.tolerance.as_secs() {
      return Err(SignatureError::Stale);
    }

    let matched = candidates.iter().any(|candidate| {
      hex::decode(candidate).is_ok_and(|expected| {
        self.mac(timestamp, payload).verify_slice(&expected).is_ok()
      })
    });
    if matched { Ok(()) } else { Err(SignatureError::Mismatch) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn verifier() -> SignatureVerifier {
    SignatureVerifier::new("whsec_test", DEFAULT_TOLERANCE).unwrap()
  }

  #[test]
  fn accepts_own_signature() {
    let v = verifier();
    let now = Utc::now();
    let header = v.sign(b"{\"id\":\"evt_1\"}", now.timestamp());
    assert_eq!(v.verify(b"{\"id\":\"evt_1\"}", Some(&header), now), Ok(()));
  }

  #[test]
  fn rejects_tampered_body_and_wrong_secret() {
    let v = verifier();
    let now = Utc::now();
    let header = v.sign(b"original", now.timestamp());
    assert_eq!(
      v.verify(b"tampered", Some(&header), now),
      Err(SignatureError::Mismatch)
    );

    let other = SignatureVerifier::new("whsec_other", DEFAULT_TOLERANCE).unwrap();
    assert_eq!(
      other.verify(b"original", Some(&header), now),
      Err(SignatureError::Mismatch)
    );
  }

  #[test]
  fn any_matching_v1_accepts() {
    let v = verifier();
    let now = Utc::now();
    let good = v.sign(b"body", now.timestamp());
    let digest = good.split_once(",v1=").unwrap().1;
    let header = format!("t={},v1=deadbeef,v0=abc,v1={digest}", now.timestamp());
    assert_eq!(v.verify(b"body", Some(&header), now), Ok(()));
  }

  #[test]
  fn empty_secret_is_refused() {
    assert_eq!(
      SignatureVerifier::new("", DEFAULT_TOLERANCE).unwrap_err(),
      SignatureError::EmptySecret
    );
  }

  #[test]
  fn rejects_stale_timestamp() {
    let v = verifier();
    let now = Utc::now();
    let header = v.sign(b"body", now.timestamp() - 301);
    assert_eq!(
      v.verify(b"body", Some(&header), now),
      Err(SignatureError::Stale)
    );
  }

  #[test]
  fn rejects_missing_and_malformed_headers() {
    let v = verifier();
    let now = Utc::now();
    assert_eq!(v.verify(b"body", None, now), Err(SignatureError::Missing));
    for header in ["", "t=abc,v1=00", "v1=00", "t=1", "garbage"] {
      assert_eq!(
        v.verify(b"body", Some(header), now),
        Err(SignatureError::Malformed),
        "header {header:?}"
      );
    }
  }
}
