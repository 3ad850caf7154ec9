//! Citations: links that evidence one attribute of the entity owning them.
//!
//! A citation is an ordinary [`EntityKind::Link`] whose `field` names an
//! attribute of its owner. Because the owner relation is untyped, the field
//! name is checked against the owner kind's schema before anything is written
//! or queried.

use crate::{
  Error, Result,
  catalog::NewLink,
  entity::Entity,
  language::LanguageCode,
  owner::attach,
  schema::EntityKind,
  store::{EntityQuery, EntityStore},
};

fn check_field(entity: &Entity, field: &str) -> Result<()> {
  if entity.has_attribute(field) {
    Ok(())
  } else {
    Err(Error::FieldNotExist {
      kind:  entity.kind(),
      field: field.to_owned(),
    })
  }
}

/// Attach a citation for `field` to `entity` and persist it.
///
/// `note` is written under `language`. Several citations for the same field
/// are allowed. `entity` itself is not modified.
pub async fn add_citation<S: EntityStore>(
  store: &S,
  entity: &Entity,
  field: &str,
  url: &str,
  note: Option<&str>,
  language: &LanguageCode,
) -> Result<Entity, S::Error> {
  check_field(entity, field)?;
  let link = NewLink {
    url:   url.to_owned(),
    label: None,
    note:  note.map(str::to_owned),
    field: Some(field.to_owned()),
  }
  .build(entity, language)?;

  let link = store.save(link).await?;
  tracing::debug!(kind = %entity.kind(), field, link = ?link.id(), "citation added");
  Ok(link)
}

/// Citations recorded for `field` on `entity`, oldest first.
pub async fn citations<S: EntityStore>(
  store: &S,
  entity: &Entity,
  field: &str,
) -> Result<Vec<Entity>, S::Error> {
  check_field(entity, field)?;
  let Ok(owner) = attach(entity) else {
    return Ok(Vec::new());
  };
  let query = EntityQuery::new(EntityKind::Link)
    .owned_by(owner)
    .with_attribute("field", field);
  store.query(&query).await
}

/// Whether at least one citation exists for `field` on `entity`.
///
/// Existence is a property of the link row, not of its translated note: a
/// citation whose note was written in another language still counts.
pub async fn citation_exists<S: EntityStore>(
  store: &S,
  entity: &Entity,
  field: &str,
) -> Result<bool, S::Error> {
  Ok(!citations(store, entity, field).await?.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    catalog::{NewContact, NewIdentifier, NewOtherName, NewPerson},
    owner::{owned, resolve},
    testing::MemoryStore,
  };

  fn lang(code: &str) -> LanguageCode { LanguageCode::new(code).unwrap() }

  async fn saved_person(store: &MemoryStore, name: &str) -> Entity {
    store
      .save(NewPerson::named(name).build(&lang("en")).unwrap())
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn add_then_exists() {
    let store = MemoryStore::default();
    let person = saved_person(&store, "john bin doe").await;

    assert!(!citation_exists(&store, &person, "name").await.unwrap());

    let link = add_citation(
      &store,
      &person,
      "name",
      "google.com",
      Some("just a link"),
      &lang("en"),
    )
    .await
    .unwrap();

    assert_eq!(link.untranslated_attribute("url").unwrap(), Some("google.com"));
    assert_eq!(link.untranslated_attribute("field").unwrap(), Some("name"));
    assert!(link.id().is_some());
    assert!(citation_exists(&store, &person, "name").await.unwrap());
    // Other fields stay uncited.
    assert!(!citation_exists(&store, &person, "family_name").await.unwrap());
  }

  #[tokio::test]
  async fn unknown_field_is_rejected() {
    let store = MemoryStore::default();
    let person = saved_person(&store, "john bin doe").await;

    let err = add_citation(&store, &person, "species", "google.com", None, &lang("en"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::FieldNotExist { kind: EntityKind::Person, .. }));

    let err = citation_exists(&store, &person, "species").await.unwrap_err();
    assert!(matches!(err, Error::FieldNotExist { .. }));

    // Nothing was written.
    assert!(owned(&store, &person, EntityKind::Link).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn every_sub_record_kind_takes_citations() {
    let store = MemoryStore::default();
    let en = lang("en");
    let person = saved_person(&store, "john jambul").await;

    let other_name = store
      .save(
        NewOtherName { family_name: Some("Jambul".into()), ..NewOtherName::named("Joe") }
          .build(&person, &en)
          .unwrap(),
      )
      .await
      .unwrap();
    let contact = store
      .save(NewContact::new("phone", "01234567").build(&person, &en).unwrap())
      .await
      .unwrap();
    let identifier = store
      .save(NewIdentifier::new("12123123213", "random").build(&person, &en).unwrap())
      .await
      .unwrap();

    for (entity, good, bad) in [
      (&other_name, "family_name", "species"),
      (&contact, "type", "handle"),
      (&identifier, "identifier", "code"),
    ] {
      assert!(!citation_exists(&store, entity, good).await.unwrap());
      add_citation(&store, entity, good, "google.com", Some("just search it"), &en)
        .await
        .unwrap();
      assert!(citation_exists(&store, entity, good).await.unwrap());
      assert!(matches!(
        add_citation(&store, entity, bad, "google.com", None, &en).await,
        Err(Error::FieldNotExist { .. })
      ));

      let links = owned(&store, entity, EntityKind::Link).await.unwrap();
      assert_eq!(links.len(), 1);
      assert_eq!(links[0].untranslated_attribute("url").unwrap(), Some("google.com"));
    }

    // Citations on sub-records do not leak onto the person.
    assert!(owned(&store, &person, EntityKind::Link).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn multiple_citations_per_field_are_kept() {
    let store = MemoryStore::default();
    let en = lang("en");
    let person = saved_person(&store, "John Doe").await;
    let contact = store
      .save(NewContact::new("phone", "01234567").build(&person, &en).unwrap())
      .await
      .unwrap();

    let first = add_citation(&store, &contact, "type", "a.example", None, &en)
      .await
      .unwrap();
    let second = add_citation(&store, &contact, "type", "b.example", None, &en)
      .await
      .unwrap();
    assert_ne!(first.id(), second.id());

    let found = citations(&store, &contact, "type").await.unwrap();
    let urls: Vec<_> = found
      .iter()
      .map(|l| l.untranslated_attribute("url").unwrap().unwrap())
      .collect();
    assert_eq!(urls, ["a.example", "b.example"]);

    for link in &found {
      let owner = resolve(&store, link.owner().unwrap()).await.unwrap();
      assert_eq!(owner.id(), contact.id());
    }
  }

  #[tokio::test]
  async fn existence_ignores_note_language() {
    let store = MemoryStore::default();
    let person = saved_person(&store, "John Doe").await;

    add_citation(&store, &person, "name", "google.com", Some("just a link"), &lang("en"))
      .await
      .unwrap();

    let link = citations(&store, &person, "name").await.unwrap().remove(0);
    assert_eq!(link.get_attribute("note", &lang("en")).unwrap(), Some("just a link"));
    assert!(matches!(
      link.get_attribute("note", &lang("ms")),
      Err(Error::TranslationMissing { .. })
    ));
    assert_eq!(link.view_with_fallback(&[&lang("ms")]).get("note"), None);
    // field and url are base attributes, visible in every language.
    assert_eq!(link.get_attribute("url", &lang("ms")).unwrap(), Some("google.com"));
    assert!(citation_exists(&store, &person, "name").await.unwrap());
  }

  #[tokio::test]
  async fn unsaved_entity_cannot_be_cited() {
    let store = MemoryStore::default();
    let person = NewPerson::named("nobody").build(&lang("en")).unwrap();

    let err = add_citation(&store, &person, "name", "google.com", None, &lang("en"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::OwnerNotPersisted(EntityKind::Person)));
    assert!(!citation_exists(&store, &person, "name").await.unwrap());
  }

  #[tokio::test]
  async fn citing_does_not_touch_the_entity() {
    let store = MemoryStore::default();
    let person = saved_person(&store, "John Doe").await;
    add_citation(&store, &person, "name", "google.com", None, &lang("en"))
      .await
      .unwrap();
    let reloaded = store
      .get(EntityKind::Person, person.id().unwrap())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(reloaded, person);
  }
}
