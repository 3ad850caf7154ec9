//! Stable opaque identity for every entity.
//!
//! Ids are generated on the client side, not by the store, so a record can be
//! built (and handed around) before anything is persisted. Once assigned an id
//! is never reassigned.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// An opaque entity identifier.
///
/// Freshly generated ids are hyphenated UUID v4 strings, but any non-empty
/// string is accepted so that externally minted ids survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::InvalidId(id));
    }
    Ok(Self(id))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Generate a fresh, statistically unique id (128 random bits).
pub fn new_id() -> EntityId { EntityId(Uuid::new_v4().hyphenated().to_string()) }

impl fmt::Display for EntityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for EntityId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for EntityId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::new(s) }
}

impl From<EntityId> for String {
  fn from(id: EntityId) -> Self { id.0 }
}
