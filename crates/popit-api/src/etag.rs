//! ETags for entity representations.
//!
//! The tag is a SHA-256 digest of the JSON body the client receives, so two
//! languages of the same entity get different tags.

use axum::http::{HeaderMap, HeaderName, header};
use popit_core::entity::EntityView;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Compute the quoted ETag for `view`.
pub fn compute_etag(view: &EntityView) -> Result<String, ApiError> {
  let body = serde_json::to_vec(view).map_err(popit_core::Error::from)?;
  let hash = Sha256::digest(&body);
  Ok(format!("\"{}\"", hex::encode(hash)))
}

/// Whether the `name` header lists `etag` (or `*`).
fn header_matches(headers: &HeaderMap, name: HeaderName, etag: &str) -> Option<bool> {
  let value = headers.get(name)?.to_str().ok()?;
  Some(value.split(',').map(str::trim).any(|candidate| {
    candidate == "*" || strip_etag_quotes(candidate) == strip_etag_quotes(etag)
  }))
}

/// `If-None-Match` on a read: true when the client already has `etag`.
pub fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
  header_matches(headers, header::IF_NONE_MATCH, etag).unwrap_or(false)
}

/// `If-Match` on a write: fails when the header is present and names some
/// other representation.
pub fn check_if_match(headers: &HeaderMap, etag: &str) -> Result<(), ApiError> {
  match header_matches(headers, header::IF_MATCH, etag) {
    Some(false) => Err(ApiError::PreconditionFailed),
    _ => Ok(()),
  }
}

/// Clients send ETags with or without the surrounding `"`.
fn strip_etag_quotes(s: &str) -> &str { s.trim_matches('"') }
