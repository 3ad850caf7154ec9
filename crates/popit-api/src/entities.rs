//! Handlers for `/{collection}` and `/{collection}/{id}` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{collection}` | `?attr=value` filters, `limit`, `offset` |
//! | `POST`   | `/{collection}` | Root kinds only; body is a flat attribute map |
//! | `GET`    | `/{collection}/{id}` | `ETag`; honours `If-None-Match` |
//! | `PUT`    | `/{collection}/{id}` | Replaces base + the language's record; optional `links` |
//! | `PATCH`  | `/{collection}/{id}` | Only the given attributes; `null` clears; optional `links` |
//! | `DELETE` | `/{collection}/{id}` | 204; owned records are kept |

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use popit_core::{
  entity::{AttributePatch, Entity, EntityView},
  identity::EntityId,
  language::LanguageCode,
  owner::resolve,
  schema::EntityKind,
  store::{EntityQuery, EntityStore},
};
use serde::Deserialize;

use crate::{
  ApiState, LanguageParams,
  error::ApiError,
  entity_response, etag, load,
  owned::{NestedLink, check_link_field, prepare_links},
  parse_target,
};

// ─── List ────────────────────────────────────────────────────────────────────

/// `limit` / `offset` must be non-negative and fit a SQLite integer.
fn parse_page(params: &HashMap<String, String>, key: &str) -> Result<Option<usize>, ApiError> {
  let Some(raw) = params.get(key) else {
    return Ok(None);
  };
  raw
    .parse::<i64>()
    .ok()
    .and_then(|n| usize::try_from(n).ok())
    .map(Some)
    .ok_or_else(|| ApiError::BadRequest(format!("{key} must be a non-negative integer")))
}

/// `GET /{collection}[?language=..][&limit=..][&offset=..][&<attr>=<value>...]`
///
/// Translated filters match in the requested language when one is given,
/// otherwise in any language.
pub async fn list<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path(collection): Path<String>,
  Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EntityView>>, ApiError> {
  let kind = EntityKind::from_collection(&collection)?;
  let requested = params.get("language").map(String::as_str);
  let language = state.language(requested)?;

  let mut query = EntityQuery::new(kind);
  if requested.is_some() {
    query = query.in_language(language.clone());
  }
  for (name, value) in &params {
    if !matches!(name.as_str(), "language" | "limit" | "offset") {
      query = query.with_attribute(name.as_str(), value.as_str());
    }
  }
  query.limit = parse_page(&params, "limit")?;
  query.offset = parse_page(&params, "offset")?;

  let entities = state
    .store
    .query(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(
    entities
      .iter()
      .map(|e| state.render(e, &language))
      .collect(),
  ))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /{collection}` with a body like `{"name": "..."}`; returns 201.
///
/// Owned kinds are created under their owner instead; posting one here is a
/// 400.
pub async fn create<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path(collection): Path<String>,
  Query(params): Query<LanguageParams>,
  Json(body): Json<AttributePatch>,
) -> Result<Response, ApiError> {
  let kind = EntityKind::from_collection(&collection)?;
  let language = state.language(params.language.as_deref())?;

  let entity = Entity::from_attributes(kind, None, &language, &body)?;
  let entity = state.store.save(entity).await.map_err(ApiError::from_store)?;

  tracing::info!(%kind, id = ?entity.id(), "entity created");
  entity_response(StatusCode::CREATED, state.render(&entity, &language))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /{collection}/{id}`
pub async fn get_one<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;

  let entity = load(&*state.store, kind, &id).await?;
  let view = state.render(&entity, &language);

  let tag = etag::compute_etag(&view)?;
  if etag::not_modified(&headers, &tag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, tag)]).into_response());
  }
  Ok(([(header::ETAG, tag)], Json(view)).into_response())
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// A `PUT`/`PATCH` body: the entity's own attributes, plus links to create
/// or update under it.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub links:      Vec<NestedLink>,
  #[serde(flatten)]
  pub attributes: AttributePatch,
}

/// Load, check `If-Match`, apply `edit`, re-validate a link's `field`,
/// then save the entity and any nested links.
async fn modify<S, F>(
  state: &ApiState<S>,
  (kind, id): (EntityKind, EntityId),
  language: &LanguageCode,
  headers: &HeaderMap,
  touches_field: bool,
  links: Vec<NestedLink>,
  edit: F,
) -> Result<Response, ApiError>
where
  S: EntityStore,
  F: FnOnce(&mut Entity) -> popit_core::Result<()> + Send,
{
  let mut entity = load(&*state.store, kind, &id).await?;
  etag::check_if_match(headers, &etag::compute_etag(&state.render(&entity, language))?)?;

  edit(&mut entity)?;

  if touches_field && let Some(owner) = entity.owner() {
    let owner = resolve(&*state.store, owner)
      .await
      .map_err(ApiError::from_store)?;
    check_link_field(&owner, &entity)?;
  }
  let links = prepare_links(&*state.store, &entity, links, language).await?;

  let entity = state.store.save(entity).await.map_err(ApiError::from_store)?;
  for link in links {
    let link = state.store.save(link).await.map_err(ApiError::from_store)?;
    tracing::debug!(owner = %kind, %id, link = ?link.id(), "nested link saved");
  }
  tracing::info!(%kind, %id, "entity updated");
  entity_response(StatusCode::OK, state.render(&entity, language))
}

/// `PUT /{collection}/{id}`: full update under the request language.
///
/// The base attributes and the language's record become exactly the body;
/// other languages are untouched.
pub async fn replace<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
  headers: HeaderMap,
  Json(body): Json<UpdateBody>,
) -> Result<Response, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;
  let touches_field = kind == EntityKind::Link;
  let UpdateBody { links, attributes } = body;

  modify(&state, (kind, id), &language, &headers, touches_field, links, |entity| {
    entity.replace_attributes(&attributes, &language)
  })
  .await
}

/// `PATCH /{collection}/{id}`: partial update under the request language.
pub async fn update<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
  headers: HeaderMap,
  Json(body): Json<UpdateBody>,
) -> Result<Response, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;
  let UpdateBody { links, attributes } = body;
  let touches_field = kind == EntityKind::Link && attributes.contains_key("field");

  modify(&state, (kind, id), &language, &headers, touches_field, links, |entity| {
    entity.apply_patch(&attributes, &language)
  })
  .await
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /{collection}/{id}`: 204, or 404 if there is nothing to delete.
pub async fn remove<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id)): Path<(String, String)>,
  Query(params): Query<LanguageParams>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;

  let entity = load(&*state.store, kind, &id).await?;
  etag::check_if_match(&headers, &etag::compute_etag(&state.render(&entity, &language))?)?;

  let deleted = state
    .store
    .delete(kind, &id)
    .await
    .map_err(ApiError::from_store)?;
  if !deleted {
    return Err(popit_core::Error::EntityNotFound { kind, id }.into());
  }
  tracing::info!(%kind, %id, "entity deleted");
  Ok(StatusCode::NO_CONTENT)
}
