//! Integration tests for `SqliteStore` against an in-memory database.

use popit_core::{
  Error as CoreError,
  catalog::{NewArea, NewContact, NewIdentifier, NewOtherName, NewPerson},
  citation::{add_citation, citation_exists, citations},
  entity::{AttributePatch, Entity},
  identity::new_id,
  language::LanguageCode,
  owner::{attach, owned, resolve},
  schema::EntityKind,
  store::{EntityQuery, EntityStore},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn lang(code: &str) -> LanguageCode { LanguageCode::new(code).unwrap() }

async fn person(s: &SqliteStore, name: &str) -> Entity {
  s.save(NewPerson::named(name).build(&lang("en")).unwrap())
    .await
    .unwrap()
}

// ─── Save / get ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_assigns_id_and_timestamps() {
  let s = store().await;
  let p = person(&s, "john bin doe").await;

  assert!(p.id().is_some());
  assert!(p.is_persisted());
  assert_eq!(p.created_at(), p.updated_at());
}

#[tokio::test]
async fn reload_equals_saved() {
  let s = store().await;
  let mut p = NewPerson {
    email: Some("john@example.com".into()),
    gender: Some("male".into()),
    ..NewPerson::named("john bin doe")
  }
  .build(&lang("en"))
  .unwrap();
  p.set_attribute("name", Some("john anak doe".into()), &lang("ms"))
    .unwrap();

  let saved = s.save(p).await.unwrap();
  let fetched = s
    .get(EntityKind::Person, saved.id().unwrap())
    .await
    .unwrap()
    .expect("row exists");

  assert_eq!(fetched, saved);
  assert_eq!(fetched.get_attribute("name", &lang("en")).unwrap(), Some("john bin doe"));
  assert_eq!(fetched.get_attribute("name", &lang("ms")).unwrap(), Some("john anak doe"));
  assert_eq!(
    fetched.untranslated_attribute("email").unwrap(),
    Some("john@example.com")
  );
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(EntityKind::Person, &new_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn get_is_scoped_by_kind() {
  let s = store().await;
  let p = person(&s, "john bin doe").await;
  assert!(s.get(EntityKind::Area, p.id().unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn resave_preserves_created_at_and_advances_updated_at() {
  let s = store().await;
  let first = person(&s, "john bin doe").await;
  let created = first.created_at();

  let mut edited = first.clone();
  edited
    .set_attribute("gender", Some("male".into()), &lang("en"))
    .unwrap();
  let second = s.save(edited).await.unwrap();

  assert_eq!(second.id(), first.id());
  assert_eq!(second.created_at(), created);
  assert!(second.updated_at() >= first.updated_at());

  let fetched = s
    .get(EntityKind::Person, first.id().unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, second);
}

#[tokio::test]
async fn stale_copy_does_not_move_updated_at_backwards() {
  let s = store().await;
  let first = person(&s, "john bin doe").await;
  let stale = first.clone();

  let newer = s.save(first).await.unwrap();
  let after_stale = s.save(stale).await.unwrap();

  assert!(after_stale.updated_at() >= newer.updated_at());
}

#[tokio::test]
async fn racing_first_saves_agree_on_created_at() {
  let s = store().await;
  let id = new_id();
  let build = || {
    NewPerson::named("john bin doe")
      .build(&lang("en"))
      .unwrap()
      .with_id(id.clone())
      .unwrap()
  };

  let (a, b) = tokio::join!(s.save(build()), s.save(build()));
  let (a, b) = (a.unwrap(), b.unwrap());
  let stored = s.get(EntityKind::Person, &id).await.unwrap().unwrap();

  assert_eq!(a.created_at(), stored.created_at());
  assert_eq!(b.created_at(), stored.created_at());
}

#[tokio::test]
async fn translation_removal_is_persisted() {
  let s = store().await;
  let mut p = NewPerson::named("john bin doe").build(&lang("en")).unwrap();
  p.set_attribute("summary", Some("a man".into()), &lang("en"))
    .unwrap();
  let saved = s.save(p).await.unwrap();

  let mut patch = AttributePatch::new();
  patch.insert("summary".into(), None);
  let mut edited = saved.clone();
  edited.apply_patch(&patch, &lang("en")).unwrap();
  s.save(edited).await.unwrap();

  let fetched = s
    .get(EntityKind::Person, saved.id().unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.get_attribute("summary", &lang("en")).unwrap(), None);
  assert_eq!(fetched.get_attribute("name", &lang("en")).unwrap(), Some("john bin doe"));
}

// ─── Owners ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_cannot_change() {
  let s = store().await;
  let alice = person(&s, "alice").await;
  let bob = person(&s, "bob").await;

  let contact = s
    .save(
      NewContact::new("voice", "+60 3 1234")
        .build(&alice, &lang("en"))
        .unwrap(),
    )
    .await
    .unwrap();

  let moved = NewContact::new("voice", "+60 3 1234")
    .build(&bob, &lang("en"))
    .unwrap()
    .with_id(contact.id().unwrap().clone())
    .unwrap();

  let err = s.save(moved).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::OwnerChanged(EntityKind::Contact))
  ));

  let fetched = s
    .get(EntityKind::Contact, contact.id().unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.owner(), Some(&attach(&alice).unwrap()));
}

#[tokio::test]
async fn owned_records_are_listed_per_owner_and_kind() {
  let s = store().await;
  let alice = person(&s, "alice").await;
  let bob = person(&s, "bob").await;

  for value in ["a@example.com", "+60 1"] {
    s.save(NewContact::new("email", value).build(&alice, &lang("en")).unwrap())
      .await
      .unwrap();
  }
  s.save(NewContact::new("email", "b@example.com").build(&bob, &lang("en")).unwrap())
    .await
    .unwrap();
  s.save(
    NewIdentifier::new("X-1", "parliament")
      .build(&alice, &lang("en"))
      .unwrap(),
  )
  .await
  .unwrap();

  let contacts = owned(&s, &alice, EntityKind::Contact).await.unwrap();
  assert_eq!(contacts.len(), 2);
  assert_eq!(
    contacts[0].untranslated_attribute("value").unwrap(),
    Some("a@example.com")
  );
  assert_eq!(contacts[1].untranslated_attribute("value").unwrap(), Some("+60 1"));

  let identifiers = owned(&s, &alice, EntityKind::Identifier).await.unwrap();
  assert_eq!(identifiers.len(), 1);
  assert_eq!(
    identifiers[0].get_attribute("scheme", &lang("en")).unwrap(),
    Some("parliament")
  );

  assert_eq!(owned(&s, &bob, EntityKind::Contact).await.unwrap().len(), 1);
}

#[tokio::test]
async fn resolve_loads_the_owner() {
  let s = store().await;
  let alice = person(&s, "alice").await;
  let other = s
    .save(NewOtherName::named("ally").build(&alice, &lang("en")).unwrap())
    .await
    .unwrap();

  let owner = resolve(&s, other.owner().unwrap()).await.unwrap();
  assert_eq!(owner, alice);
}

#[tokio::test]
async fn deleting_owner_leaves_owned_records_dangling() {
  let s = store().await;
  let alice = person(&s, "alice").await;
  let contact = s
    .save(NewContact::new("email", "a@example.com").build(&alice, &lang("en")).unwrap())
    .await
    .unwrap();

  assert!(s.delete(EntityKind::Person, alice.id().unwrap()).await.unwrap());
  assert!(!s.delete(EntityKind::Person, alice.id().unwrap()).await.unwrap());

  let still_there = s
    .get(EntityKind::Contact, contact.id().unwrap())
    .await
    .unwrap()
    .expect("owned record survives");
  let err = resolve(&s, still_there.owner().unwrap()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::OwnerNotFound(_))));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_by_base_attribute() {
  let s = store().await;
  s.save(
    NewArea { identifier: Some("P001".into()), ..NewArea::named("Padang Besar") }
      .build(&lang("en"))
      .unwrap(),
  )
  .await
  .unwrap();
  s.save(
    NewArea { identifier: Some("P002".into()), ..NewArea::named("Kangar") }
      .build(&lang("en"))
      .unwrap(),
  )
  .await
  .unwrap();

  let found = s
    .query(&EntityQuery::new(EntityKind::Area).with_attribute("identifier", "P002"))
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].get_attribute("name", &lang("en")).unwrap(), Some("Kangar"));
}

#[tokio::test]
async fn query_by_translated_attribute_respects_language() {
  let s = store().await;
  let mut p = NewPerson::named("john bin doe").build(&lang("en")).unwrap();
  p.set_attribute("name", Some("john anak doe".into()), &lang("ms"))
    .unwrap();
  s.save(p).await.unwrap();
  person(&s, "jane doe").await;

  let any = s
    .query(&EntityQuery::new(EntityKind::Person).with_attribute("name", "john anak doe"))
    .await
    .unwrap();
  assert_eq!(any.len(), 1);

  let in_ms = s
    .query(
      &EntityQuery::new(EntityKind::Person)
        .with_attribute("name", "john anak doe")
        .in_language(lang("ms")),
    )
    .await
    .unwrap();
  assert_eq!(in_ms.len(), 1);

  let in_en = s
    .query(
      &EntityQuery::new(EntityKind::Person)
        .with_attribute("name", "john anak doe")
        .in_language(lang("en")),
    )
    .await
    .unwrap();
  assert!(in_en.is_empty());
}

#[tokio::test]
async fn query_rejects_unknown_attribute() {
  let s = store().await;
  let err = s
    .query(&EntityQuery::new(EntityKind::Person).with_attribute("species", "cat"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::FieldNotExist { .. })));
}

#[tokio::test]
async fn query_pages_in_creation_order() {
  let s = store().await;
  for name in ["a", "b", "c", "d"] {
    person(&s, name).await;
  }

  let mut q = EntityQuery::new(EntityKind::Person);
  q.limit = Some(2);
  q.offset = Some(1);
  let page = s.query(&q).await.unwrap();
  let names: Vec<_> = page
    .iter()
    .map(|p| p.get_attribute("name", &lang("en")).unwrap().unwrap().to_owned())
    .collect();
  assert_eq!(names, ["b", "c"]);

  let mut q = EntityQuery::new(EntityKind::Person);
  q.offset = Some(3);
  assert_eq!(s.query(&q).await.unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_page_bounds_are_clamped() {
  let s = store().await;
  person(&s, "a").await;

  let mut q = EntityQuery::new(EntityKind::Person);
  q.limit = Some(usize::MAX);
  assert_eq!(s.query(&q).await.unwrap().len(), 1);

  let mut q = EntityQuery::new(EntityKind::Person);
  q.offset = Some(usize::MAX);
  assert!(s.query(&q).await.unwrap().is_empty());
}

// ─── Citations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn citation_roundtrip() {
  let s = store().await;
  let p = person(&s, "john bin doe").await;

  assert!(!citation_exists(&s, &p, "name").await.unwrap());
  add_citation(&s, &p, "name", "google.com", Some("just a link"), &lang("en"))
    .await
    .unwrap();
  add_citation(&s, &p, "name", "example.org", None, &lang("en"))
    .await
    .unwrap();

  assert!(citation_exists(&s, &p, "name").await.unwrap());
  assert!(!citation_exists(&s, &p, "family_name").await.unwrap());

  let links = citations(&s, &p, "name").await.unwrap();
  let urls: Vec<_> = links
    .iter()
    .map(|l| l.untranslated_attribute("url").unwrap().unwrap())
    .collect();
  assert_eq!(urls, ["google.com", "example.org"]);
}

#[tokio::test]
async fn citation_note_is_visible_only_in_its_language() {
  let s = store().await;
  let p = person(&s, "john bin doe").await;

  add_citation(&s, &p, "name", "google.com", Some("just a link"), &lang("en"))
    .await
    .unwrap();

  let links = citations(&s, &p, "name").await.unwrap();
  assert_eq!(links.len(), 1);
  let link = &links[0];
  assert_eq!(link.get_attribute("note", &lang("en")).unwrap(), Some("just a link"));
  assert!(matches!(
    link.get_attribute("note", &lang("ms")),
    Err(CoreError::TranslationMissing { .. })
  ));
  assert_eq!(link.view_with_fallback(&[&lang("ms")]).get("note"), None);

  // Existence does not depend on the note's language.
  assert!(citation_exists(&s, &p, "name").await.unwrap());
}

#[tokio::test]
async fn citation_on_owned_record() {
  let s = store().await;
  let p = person(&s, "john bin doe").await;
  let contact = s
    .save(NewContact::new("email", "j@example.com").build(&p, &lang("en")).unwrap())
    .await
    .unwrap();

  add_citation(&s, &contact, "value", "example.org/source", None, &lang("en"))
    .await
    .unwrap();

  assert!(citation_exists(&s, &contact, "value").await.unwrap());
  assert!(!citation_exists(&s, &p, "email").await.unwrap());
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn data_survives_reopen() {
  let dir = std::env::temp_dir().join(format!("popit-store-{}", new_id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("popit.db");

  let saved = {
    let s = SqliteStore::open(&path).await.unwrap();
    person(&s, "john bin doe").await
  };

  let s = SqliteStore::open(&path).await.unwrap();
  let fetched = s
    .get(EntityKind::Person, saved.id().unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, saved);

  let _ = std::fs::remove_dir_all(&dir);
}
