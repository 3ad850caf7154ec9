//! Error types for `popit-core`.

use thiserror::Error;

use crate::{identity::EntityId, language::LanguageCode, owner::OwnerRef, schema::EntityKind};

#[derive(Debug, Error)]
pub enum Error {
  /// The attribute is not declared on the entity kind.
  #[error("{field} does not exist on {kind}")]
  FieldNotExist { kind: EntityKind, field: String },

  #[error("{kind} requires {field}")]
  MissingField { kind: EntityKind, field: &'static str },

  /// Sub-records can only hang off an entity that already has an id.
  #[error("{0} must be saved before it can own records")]
  OwnerNotPersisted(EntityKind),

  #[error("owner not found: {0}")]
  OwnerNotFound(OwnerRef),

  /// Owned records cannot be moved to another owner.
  #[error("the owner of a {0} cannot be changed")]
  OwnerChanged(EntityKind),

  #[error("{0} records must have an owner")]
  OwnerRequired(EntityKind),

  #[error("{0} records cannot have an owner")]
  UnexpectedOwner(EntityKind),

  #[error("{kind} has no translation for {language}")]
  TranslationMissing { kind: EntityKind, language: LanguageCode },

  /// The entity has no id or timestamps yet.
  #[error("{0} has not been saved")]
  NotSaved(EntityKind),

  #[error("{kind} not found: {id}")]
  EntityNotFound { kind: EntityKind, id: EntityId },

  #[error("unknown entity kind: {0:?}")]
  UnknownEntityKind(String),

  #[error("invalid language code: {0:?}")]
  InvalidLanguage(String),

  #[error("entity already has id {0}")]
  IdAlreadyAssigned(EntityId),

  #[error("invalid entity id: {0:?}")]
  InvalidId(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
