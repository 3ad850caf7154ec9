//! Polymorphic owner references.
//!
//! Links, contacts, identifiers and other names can hang off any entity. The
//! owner is recorded as a `(kind, id)` pair; [`EntityKind`] is the registry
//! that maps the tag back to a concrete kind, and the store is the repository
//! for every kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  entity::Entity,
  identity::EntityId,
  schema::EntityKind,
  store::{EntityQuery, EntityStore},
};

/// Points from an owned record to its owner. Set at creation, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
  pub kind: EntityKind,
  pub id:   EntityId,
}

impl fmt::Display for OwnerRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.id)
  }
}

/// Capture a reference to `owner`. The owner must already have an id.
pub fn attach(owner: &Entity) -> Result<OwnerRef> {
  let id = owner
    .id()
    .cloned()
    .ok_or(Error::OwnerNotPersisted(owner.kind()))?;
  Ok(OwnerRef { kind: owner.kind(), id })
}

/// Load the entity an [`OwnerRef`] points at.
///
/// Owners can be deleted without their owned records, so a dangling reference
/// is reported as [`Error::OwnerNotFound`] rather than healed.
pub async fn resolve<S: EntityStore>(
  store: &S,
  owner: &OwnerRef,
) -> Result<Entity, S::Error> {
  store
    .get(owner.kind, &owner.id)
    .await?
    .ok_or_else(|| Error::OwnerNotFound(owner.clone()).into())
}

/// All records of `kind` owned by `owner`, oldest first. An unsaved owner
/// owns nothing.
pub async fn owned<S: EntityStore>(
  store: &S,
  owner: &Entity,
  kind: EntityKind,
) -> Result<Vec<Entity>, S::Error> {
  let Ok(owner) = attach(owner) else {
    return Ok(Vec::new());
  };
  store.query(&EntityQuery::new(kind).owned_by(owner)).await
}
