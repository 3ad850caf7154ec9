//! Handlers for records owned by another entity.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/{collection}/{id}/{sub}` | e.g. `/persons/{id}/contacts`, oldest first |
//! | `POST` | `/{collection}/{id}/{sub}` | Creates a `sub` record owned by `{id}`; 201 |
//!
//! Links can also be written through their owner: a `PUT`/`PATCH` body may
//! carry a `links` array, see [`NestedLink`].

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::Response,
};
use popit_core::{
  Error as CoreError,
  entity::{AttributePatch, Entity, EntityView},
  identity::EntityId,
  language::LanguageCode,
  owner::{attach, owned},
  schema::EntityKind,
  store::EntityStore,
};
use serde::Deserialize;

use crate::{
  ApiState, LanguageParams, entity_response, error::ApiError, load, parse_target,
};

/// A link's `field` must name an attribute of its owner, the same check a
/// citation gets.
pub(crate) fn check_link_field(owner: &Entity, link: &Entity) -> Result<(), CoreError> {
  if link.kind() != EntityKind::Link {
    return Ok(());
  }
  match link.untranslated_attribute("field")? {
    Some(field) => owner.schema().check(field).map(|_| ()),
    None => Ok(()),
  }
}

/// One entry of a `links` array in a parent's update body.
#[derive(Debug, Deserialize)]
pub struct NestedLink {
  /// An existing link of the parent to update; a new link is created when
  /// absent.
  pub id:         Option<String>,
  #[serde(flatten)]
  pub attributes: AttributePatch,
}

/// Turn nested links into link entities ready to save under `owner`.
///
/// Everything is validated before the caller saves anything: unknown
/// attributes, a missing `url` on a new link, a `field` the owner does not
/// have, or an id that is not one of the owner's links.
pub(crate) async fn prepare_links<S: EntityStore>(
  store: &S,
  owner: &Entity,
  links: Vec<NestedLink>,
  language: &LanguageCode,
) -> Result<Vec<Entity>, ApiError> {
  let owner_ref = attach(owner)?;
  let mut prepared = Vec::with_capacity(links.len());
  for nested in links {
    let link = match nested.id {
      Some(id) => {
        let id = EntityId::new(id)?;
        let mut link = load(store, EntityKind::Link, &id).await?;
        if link.owner() != Some(&owner_ref) {
          return Err(CoreError::EntityNotFound { kind: EntityKind::Link, id }.into());
        }
        link.apply_patch(&nested.attributes, language)?;
        link
      }
      None => Entity::from_attributes(
        EntityKind::Link,
        Some(owner_ref.clone()),
        language,
        &nested.attributes,
      )?,
    };
    check_link_field(owner, &link)?;
    prepared.push(link);
  }
  Ok(prepared)
}

/// Roots are never owned, so they are not valid `{sub}` segments.
fn owned_kind(sub: &str) -> Result<EntityKind, CoreError> {
  let kind = EntityKind::from_collection(sub)?;
  if kind.is_root() {
    return Err(CoreError::UnexpectedOwner(kind));
  }
  Ok(kind)
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /{collection}/{id}/{sub}`
pub async fn list<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id, sub)): Path<(String, String, String)>,
  Query(params): Query<LanguageParams>,
) -> Result<Json<Vec<EntityView>>, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let sub_kind = owned_kind(&sub)?;
  let language = state.language(params.language.as_deref())?;

  let owner = load(&*state.store, kind, &id).await?;
  let records = owned(&*state.store, &owner, sub_kind)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(
    records
      .iter()
      .map(|r| state.render(r, &language))
      .collect(),
  ))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /{collection}/{id}/{sub}`: body is a flat attribute map; returns
/// 201.
pub async fn create<S: EntityStore>(
  State(state): State<ApiState<S>>,
  Path((collection, id, sub)): Path<(String, String, String)>,
  Query(params): Query<LanguageParams>,
  Json(body): Json<AttributePatch>,
) -> Result<Response, ApiError> {
  let (kind, id) = parse_target(&collection, id)?;
  let sub_kind = owned_kind(&sub)?;
  let language = state.language(params.language.as_deref())?;

  let owner = load(&*state.store, kind, &id).await?;
  let record = Entity::from_attributes(sub_kind, Some(attach(&owner)?), &language, &body)?;
  check_link_field(&owner, &record)?;

  let record = state.store.save(record).await.map_err(ApiError::from_store)?;
  tracing::info!(owner = %kind, %id, kind = %sub_kind, "owned record created");
  entity_response(StatusCode::CREATED, state.render(&record, &language))
}

#[cfg(test)]
mod tests {
  use popit_core::{
    catalog::{NewLink, NewPerson},
    identity::new_id,
    language::LanguageCode,
  };

  use super::*;

  fn en() -> LanguageCode { LanguageCode::new("en").unwrap() }

  fn saved_person() -> Entity {
    NewPerson::named("alice").build(&en()).unwrap().with_id(new_id()).unwrap()
  }

  #[test]
  fn link_field_is_checked_against_owner() {
    let person = saved_person();
    let good = NewLink { field: Some("name".into()), ..NewLink::new("example.org") }
      .build(&person, &en())
      .unwrap();
    assert!(check_link_field(&person, &good).is_ok());

    let mut bad = good.clone();
    bad
      .set_attribute("field", Some("species".into()), &en())
      .unwrap();
    assert!(matches!(
      check_link_field(&person, &bad),
      Err(CoreError::FieldNotExist { kind: EntityKind::Person, .. })
    ));
  }

  #[test]
  fn roots_are_not_owned_kinds() {
    assert_eq!(owned_kind("contacts").unwrap(), EntityKind::Contact);
    assert!(matches!(owned_kind("persons"), Err(CoreError::UnexpectedOwner(_))));
    assert!(matches!(owned_kind("cats"), Err(CoreError::UnknownEntityKind(_))));
  }
}
