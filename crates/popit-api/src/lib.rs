//! JSON REST API for the Popolo entity store.
//!
//! Exposes an axum [`Router`] backed by any [`popit_core::store::EntityStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! Every route takes an optional `?language=xx`. Writes store translated
//! attributes under that language; reads render the entity in it, falling
//! back to the default language and then to the untranslated view.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(popit_api::api_router(ApiState::new(store.clone(), language)))
//! ```

pub mod citations;
pub mod entities;
pub mod error;
pub mod etag;
pub mod owned;

use std::sync::Arc;

use axum::{
  Json,
  Router,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
  routing::get,
};
use popit_core::{
  entity::{Entity, EntityView},
  identity::EntityId,
  language::LanguageCode,
  schema::EntityKind,
  store::EntityStore,
};
use serde::Deserialize;

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub store:            Arc<S>,
  /// Used when a request names no language, and as the read fallback when
  /// the requested language has no record.
  pub default_language: LanguageCode,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:            Arc::clone(&self.store),
      default_language: self.default_language.clone(),
    }
  }
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, default_language: LanguageCode) -> Self {
    Self { store, default_language }
  }

  /// The language a request acts in.
  pub fn language(&self, requested: Option<&str>) -> Result<LanguageCode, ApiError> {
    match requested {
      Some(code) => Ok(LanguageCode::new(code)?),
      None => Ok(self.default_language.clone()),
    }
  }

  /// Render `entity` for a response in `language`.
  ///
  /// Links never fall back: a note written in one language is not shown
  /// in another, only the link's base attributes are.
  pub fn render(&self, entity: &Entity, language: &LanguageCode) -> EntityView {
    if entity.kind() == EntityKind::Link {
      return entity.view_with_fallback(&[language]);
    }
    entity.view_with_fallback(&[language, &self.default_language])
  }
}

/// `?language=xx`, accepted by every route.
#[derive(Debug, Default, Deserialize)]
pub struct LanguageParams {
  pub language: Option<String>,
}

// ─── Shared handler helpers ──────────────────────────────────────────────────

/// Parse a `{collection}/{id}` pair from the path.
pub(crate) fn parse_target(
  collection: &str,
  id: String,
) -> Result<(EntityKind, EntityId), ApiError> {
  Ok((EntityKind::from_collection(collection)?, EntityId::new(id)?))
}

/// Load an entity or fail with a 404.
pub(crate) async fn load<S: EntityStore>(
  store: &S,
  kind: EntityKind,
  id: &EntityId,
) -> Result<Entity, ApiError> {
  store
    .get(kind, id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      popit_core::Error::EntityNotFound { kind, id: id.clone() }.into()
    })
}

/// A JSON entity body with its `ETag`.
pub(crate) fn entity_response(
  status: StatusCode,
  view: EntityView,
) -> Result<Response, ApiError> {
  let tag = etag::compute_etag(&view)?;
  Ok((status, [(header::ETAG, tag)], Json(view)).into_response())
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: EntityStore + 'static,
{
  Router::new()
    // Collections
    .route(
      "/{collection}",
      get(entities::list::<S>).post(entities::create::<S>),
    )
    .route(
      "/{collection}/{id}",
      get(entities::get_one::<S>)
        .put(entities::replace::<S>)
        .patch(entities::update::<S>)
        .delete(entities::remove::<S>),
    )
    // Citations
    .route(
      "/{collection}/{id}/citations/{field}",
      get(citations::list::<S>).post(citations::create::<S>),
    )
    // Owned records
    .route(
      "/{collection}/{id}/{sub}",
      get(owned::list::<S>).post(owned::create::<S>),
    )
    .with_state(state)
}
