//! Typed factories for the concrete Popolo entities.
//!
//! Each `New*` struct names the fields a caller can supply for one kind and
//! builds an unsaved [`Entity`] under a given language. Owned kinds take the
//! owner entity, which must already be saved.

use crate::{
  Error, Result,
  entity::{AttributePatch, Entity},
  language::LanguageCode,
  owner::attach,
  schema::EntityKind,
};

/// Collect the set values of `pairs` into a patch.
fn patch<const N: usize>(pairs: [(&str, Option<String>); N]) -> AttributePatch {
  pairs
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name.to_owned(), Some(v))))
    .collect()
}

// ─── Roots ───────────────────────────────────────────────────────────────────

/// A person (Popolo `Person`).
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
  pub name:              String,
  pub family_name:       Option<String>,
  pub given_name:        Option<String>,
  pub additional_name:   Option<String>,
  pub honorific_prefix:  Option<String>,
  pub honorific_suffix:  Option<String>,
  pub patronymic_name:   Option<String>,
  pub sort_name:         Option<String>,
  pub email:             Option<String>,
  pub gender:            Option<String>,
  pub birth_date:        Option<String>,
  pub death_date:        Option<String>,
  pub image:             Option<String>,
  pub summary:           Option<String>,
  pub biography:         Option<String>,
  pub national_identity: Option<String>,
}

impl NewPerson {
  /// The minimum needed to create a person.
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn build(self, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("name", Some(self.name)),
      ("family_name", self.family_name),
      ("given_name", self.given_name),
      ("additional_name", self.additional_name),
      ("honorific_prefix", self.honorific_prefix),
      ("honorific_suffix", self.honorific_suffix),
      ("patronymic_name", self.patronymic_name),
      ("sort_name", self.sort_name),
      ("email", self.email),
      ("gender", self.gender),
      ("birth_date", self.birth_date),
      ("death_date", self.death_date),
      ("image", self.image),
      ("summary", self.summary),
      ("biography", self.biography),
      ("national_identity", self.national_identity),
    ]);
    Entity::from_attributes(EntityKind::Person, None, language, &attrs)
  }
}

/// A geographic area (Popolo `Area`).
#[derive(Debug, Clone, Default)]
pub struct NewArea {
  pub name:           String,
  pub classification: Option<String>,
  pub identifier:     Option<String>,
  /// Id of the enclosing area, if any.
  pub parent_id:      Option<String>,
}

impl NewArea {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn build(self, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("name", Some(self.name)),
      ("classification", self.classification),
      ("identifier", self.identifier),
      ("parent_id", self.parent_id),
    ]);
    Entity::from_attributes(EntityKind::Area, None, language, &attrs)
  }
}

/// A position in an organization (Popolo `Post`), e.g. a seat.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
  pub label:           String,
  pub role:            Option<String>,
  pub organization_id: Option<String>,
  pub area_id:         Option<String>,
  pub start_date:      Option<String>,
  pub end_date:        Option<String>,
}

impl NewPost {
  pub fn labelled(label: impl Into<String>) -> Self {
    Self { label: label.into(), ..Default::default() }
  }

  pub fn build(self, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("label", Some(self.label)),
      ("role", self.role),
      ("organization_id", self.organization_id),
      ("area_id", self.area_id),
      ("start_date", self.start_date),
      ("end_date", self.end_date),
    ]);
    Entity::from_attributes(EntityKind::Post, None, language, &attrs)
  }
}

// ─── Owned records ───────────────────────────────────────────────────────────

/// A link, optionally evidencing one attribute of its owner.
#[derive(Debug, Clone, Default)]
pub struct NewLink {
  pub url:   String,
  pub label: Option<String>,
  pub note:  Option<String>,
  /// The owner attribute this link is a citation for. Validated against the
  /// owner's kind once, here.
  pub field: Option<String>,
}

impl NewLink {
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into(), ..Default::default() }
  }

  pub fn build(self, owner: &Entity, language: &LanguageCode) -> Result<Entity> {
    if let Some(field) = &self.field
      && !owner.has_attribute(field)
    {
      return Err(Error::FieldNotExist {
        kind:  owner.kind(),
        field: field.clone(),
      });
    }
    let attrs = patch([
      ("url", Some(self.url)),
      ("label", self.label),
      ("note", self.note),
      ("field", self.field),
    ]);
    Entity::from_attributes(EntityKind::Link, Some(attach(owner)?), language, &attrs)
  }
}

/// A contact point (Popolo `ContactDetail`).
#[derive(Debug, Clone, Default)]
pub struct NewContact {
  /// e.g. `phone`, `email`, `twitter`.
  pub contact_type: String,
  pub value:        String,
  pub label:        Option<String>,
  pub note:         Option<String>,
  pub valid_from:   Option<String>,
  pub valid_until:  Option<String>,
}

impl NewContact {
  pub fn new(contact_type: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      contact_type: contact_type.into(),
      value: value.into(),
      ..Default::default()
    }
  }

  pub fn build(self, owner: &Entity, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("type", Some(self.contact_type)),
      ("value", Some(self.value)),
      ("label", self.label),
      ("note", self.note),
      ("valid_from", self.valid_from),
      ("valid_until", self.valid_until),
    ]);
    Entity::from_attributes(EntityKind::Contact, Some(attach(owner)?), language, &attrs)
  }
}

/// An external identifier issued under some scheme.
#[derive(Debug, Clone)]
pub struct NewIdentifier {
  pub identifier: String,
  pub scheme:     String,
}

impl NewIdentifier {
  pub fn new(identifier: impl Into<String>, scheme: impl Into<String>) -> Self {
    Self { identifier: identifier.into(), scheme: scheme.into() }
  }

  pub fn build(self, owner: &Entity, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("identifier", Some(self.identifier)),
      ("scheme", Some(self.scheme)),
    ]);
    Entity::from_attributes(
      EntityKind::Identifier,
      Some(attach(owner)?),
      language,
      &attrs,
    )
  }
}

/// An alternate or former name.
#[derive(Debug, Clone, Default)]
pub struct NewOtherName {
  pub name:             String,
  pub family_name:      Option<String>,
  pub given_name:       Option<String>,
  pub additional_name:  Option<String>,
  pub honorific_prefix: Option<String>,
  pub honorific_suffix: Option<String>,
  pub patronymic_name:  Option<String>,
  /// Free-form; often only a year is known.
  pub start_date:       Option<String>,
  pub end_date:         Option<String>,
  pub note:             Option<String>,
}

impl NewOtherName {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn build(self, owner: &Entity, language: &LanguageCode) -> Result<Entity> {
    let attrs = patch([
      ("name", Some(self.name)),
      ("family_name", self.family_name),
      ("given_name", self.given_name),
      ("additional_name", self.additional_name),
      ("honorific_prefix", self.honorific_prefix),
      ("honorific_suffix", self.honorific_suffix),
      ("patronymic_name", self.patronymic_name),
      ("start_date", self.start_date),
      ("end_date", self.end_date),
      ("note", self.note),
    ]);
    Entity::from_attributes(
      EntityKind::OtherName,
      Some(attach(owner)?),
      language,
      &attrs,
    )
  }
}
