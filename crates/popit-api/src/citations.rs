//! Handlers for `/{collection}/{id}/citations/{field}`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/{collection}/{id}/citations/{field}` | `{field, exists, citations}` |
//! | `POST` | `/{collection}/{id}/citations/{field}` | Body: `{"url":"...","note":"..."}`; 201 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::Response,
};
use popit_core::{
  citation::{add_citation, citations},
  entity::EntityView,
  store::EntityStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, LanguageParams, entity_response, error::ApiError, load, parse_target};

#[derive(Debug, Serialize)]
pub struct CitationList {
  pub field:     String,
  pub exists:    bool,
  pub citations: Vec<EntityView>,
}

/// `GET /{collection}/{id}/citations/{field}`
pub async fn list<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id, field)): Path<(String, String, String)>,
  Query(params): Query<LanguageParams>,
) -> Result<Json<CitationList>, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;

  let entity = load(&*state.store, kind, &id).await?;
  let links = citations(&*state.store, &entity, &field)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(CitationList {
    exists: !links.is_empty(),
    citations: links.iter().map(|l| state.render(l, &language)).collect(),
    field,
  }))
}

#[derive(Debug, Deserialize)]
pub struct CitationBody {
  pub url:  String,
  pub note: Option<String>,
}

/// `POST /{collection}/{id}/citations/{field}`: the note is written under
/// the request language.
pub async fn create<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id, field)): Path<(String, String, String)>,
  Query(params): Query<LanguageParams>,
  Json(body): Json<CitationBody>,
) -> Result<Response, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let language = state.language(params.language.as_deref())?;

  let entity = load(&*state.store, kind, &id).await?;
  let link = add_citation(
    &*state.store,
    &entity,
    &field,
    &body.url,
    body.note.as_deref(),
    &language,
  )
  .await
  .map_err(ApiError::from_store)?;

  entity_response(StatusCode::CREATED, state.render(&link, &language))
}
