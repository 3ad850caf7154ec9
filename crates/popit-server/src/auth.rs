//! HTTP Basic-auth verifier and the middleware that guards writes.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use crate::error::Error;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl AuthConfig {
  /// Parse the configured hash, so a malformed one fails at startup rather
  /// than on every write.
  pub fn check_hash(&self) -> Result<(), password_hash::Error> {
    PasswordHash::new(&self.password_hash).map(|_| ())
  }
}

/// Hash `password` into a PHC string suitable for `auth_password_hash`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Reads are public; everything else needs credentials.
fn is_write(method: &Method) -> bool {
  !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Middleware: reject unauthenticated writes with 401.
pub async fn require_auth_for_writes(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if is_write(req.method())
    && let Err(e) = verify_auth(req.headers(), &auth)
  {
    tracing::warn!(method = %req.method(), path = %req.uri().path(), "rejected unauthenticated write");
    return Err(e);
  }
  Ok(next.run(req).await)
}
