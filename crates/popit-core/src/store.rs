//! The `EntityStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `popit-store-sqlite`).
//! The citation engine and the REST layer depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  Error, Result,
  entity::Entity,
  identity::EntityId,
  language::LanguageCode,
  owner::OwnerRef,
  schema::{AttributeScope, EntityKind},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Error type of a store backend. Backends wrap core errors so callers can
/// still tell a missing field from a failing disk.
pub trait StoreError: std::error::Error + From<Error> + Send + Sync + 'static {
  /// The core error inside this error, if that is what it is.
  fn as_core(&self) -> Option<&Error>;
}

impl StoreError for Error {
  fn as_core(&self) -> Option<&Error> { Some(self) }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// One `name = value` condition of an [`EntityQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
  pub name:  String,
  pub value: String,
}

/// Parameters for [`EntityStore::query`].
#[derive(Debug, Clone)]
pub struct EntityQuery {
  pub kind:     EntityKind,
  /// Restrict to records owned by this entity.
  pub owner:    Option<OwnerRef>,
  /// Every filter must match. Base attributes compare against the base
  /// record; translated ones against the record for `language`, or any
  /// language when `language` is unset.
  pub filters:  Vec<AttributeFilter>,
  pub language: Option<LanguageCode>,
  pub limit:    Option<usize>,
  pub offset:   Option<usize>,
}

impl EntityQuery {
  pub fn new(kind: EntityKind) -> Self {
    Self {
      kind,
      owner: None,
      filters: Vec::new(),
      language: None,
      limit: None,
      offset: None,
    }
  }

  pub fn owned_by(mut self, owner: OwnerRef) -> Self {
    self.owner = Some(owner);
    self
  }

  pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.push(AttributeFilter { name: name.into(), value: value.into() });
    self
  }

  pub fn in_language(mut self, language: LanguageCode) -> Self {
    self.language = Some(language);
    self
  }

  /// Resolve each filter's scope, rejecting names the kind does not declare.
  pub fn scoped_filters(&self) -> Result<Vec<(AttributeScope, &AttributeFilter)>> {
    let schema = self.kind.schema();
    self
      .filters
      .iter()
      .map(|f| Ok((schema.check(&f.name)?, f)))
      .collect()
  }

  /// Whether `entity` satisfies every condition of this query. Backends that
  /// cannot push a condition down to storage can use this as a post-filter.
  pub fn matches(&self, entity: &Entity) -> Result<bool> {
    if entity.kind() != self.kind {
      return Ok(false);
    }
    if let Some(owner) = &self.owner
      && entity.owner() != Some(owner)
    {
      return Ok(false);
    }
    for (scope, filter) in self.scoped_filters()? {
      let wanted = Some(filter.value.as_str());
      let hit = match (scope, &self.language) {
        (AttributeScope::Base, _) => entity.untranslated_attribute(&filter.name)? == wanted,
        (AttributeScope::Translated, Some(language)) => entity
          .translations()
          .get(language)
          .is_some_and(|r| r.get(&filter.name).map(String::as_str) == wanted),
        (AttributeScope::Translated, None) => entity
          .translations()
          .values()
          .any(|r| r.get(&filter.name).map(String::as_str) == wanted),
      };
      if !hit {
        return Ok(false);
      }
    }
    Ok(true)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Popolo entity store backend.
///
/// Each call is atomic on its own. Composing several calls into one unit of
/// work is the caller's business.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait EntityStore: Send + Sync {
  type Error: StoreError;

  /// Insert or update `entity` and return it as persisted.
  ///
  /// An entity without an id gets a fresh one. An entity with an id is
  /// updated if a row exists, otherwise inserted under that id. The owner
  /// of an existing row is never changed. `created_at` / `updated_at` are
  /// maintained by the store.
  fn save(
    &self,
    entity: Entity,
  ) -> impl Future<Output = Result<Entity, Self::Error>> + Send + '_;

  /// Retrieve an entity with all of its translations. `None` if not found.
  fn get<'a>(
    &'a self,
    kind: EntityKind,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  /// Entities matching `query`, oldest first.
  fn query<'a>(
    &'a self,
    query: &'a EntityQuery,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + 'a;

  /// Delete one entity and its translations. Records it owns are left in
  /// place. Returns `false` if there was nothing to delete.
  fn delete<'a>(
    &'a self,
    kind: EntityKind,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
