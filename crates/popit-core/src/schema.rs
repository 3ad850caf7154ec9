//! Static attribute tables for every entity kind.
//!
//! Each kind declares which attributes it has and whether they are
//! language-invariant ("base") or stored per language ("translated"). The
//! citation engine and the update paths validate field names against these
//! tables with plain set membership.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Every kind of record the store knows about. The snake-case name doubles as
/// the owner type tag persisted on owned records.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Person,
  Area,
  Post,
  Link,
  Contact,
  Identifier,
  OtherName,
}

impl EntityKind {
  pub const ALL: [EntityKind; 7] = [
    Self::Person,
    Self::Area,
    Self::Post,
    Self::Link,
    Self::Contact,
    Self::Identifier,
    Self::OtherName,
  ];

  /// The type tag stored in `kind` / `owner_kind` columns.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn tag(self) -> &'static str {
    match self {
      Self::Person => "person",
      Self::Area => "area",
      Self::Post => "post",
      Self::Link => "link",
      Self::Contact => "contact",
      Self::Identifier => "identifier",
      Self::OtherName => "other_name",
    }
  }

  pub fn from_tag(tag: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|k| k.tag() == tag)
      .ok_or_else(|| Error::UnknownEntityKind(tag.to_owned()))
  }

  /// The plural name used in REST paths, e.g. `persons` or `other_names`.
  pub fn collection(self) -> &'static str {
    match self {
      Self::Person => "persons",
      Self::Area => "areas",
      Self::Post => "posts",
      Self::Link => "links",
      Self::Contact => "contacts",
      Self::Identifier => "identifiers",
      Self::OtherName => "other_names",
    }
  }

  pub fn from_collection(name: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|k| k.collection() == name)
      .ok_or_else(|| Error::UnknownEntityKind(name.to_owned()))
  }

  /// Aggregate roots stand alone; every other kind hangs off an owner.
  pub fn is_root(self) -> bool { matches!(self, Self::Person | Self::Area | Self::Post) }

  pub fn schema(self) -> &'static EntitySchema {
    match self {
      Self::Person => &PERSON,
      Self::Area => &AREA,
      Self::Post => &POST,
      Self::Link => &LINK,
      Self::Contact => &CONTACT,
      Self::Identifier => &IDENTIFIER,
      Self::OtherName => &OTHER_NAME,
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Where an attribute's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeScope {
  /// Language-invariant; one value per entity.
  Base,
  /// One value per entity per language.
  Translated,
}

/// The declared attribute set of one entity kind.
#[derive(Debug)]
pub struct EntitySchema {
  pub kind:       EntityKind,
  pub base:       &'static [&'static str],
  pub translated: &'static [&'static str],
  /// Attributes that must be present when a record is created. Translated
  /// ones are checked under the creating language only.
  pub required:   &'static [&'static str],
}

impl EntitySchema {
  pub fn scope(&self, name: &str) -> Option<AttributeScope> {
    if self.base.contains(&name) {
      Some(AttributeScope::Base)
    } else if self.translated.contains(&name) {
      Some(AttributeScope::Translated)
    } else {
      None
    }
  }

  pub fn has_attribute(&self, name: &str) -> bool { self.scope(name).is_some() }

  /// Like [`Self::scope`], but an undeclared name is a [`Error::FieldNotExist`].
  pub fn check(&self, name: &str) -> Result<AttributeScope> {
    self.scope(name).ok_or_else(|| Error::FieldNotExist {
      kind:  self.kind,
      field: name.to_owned(),
    })
  }

  /// Base attributes followed by translated ones.
  pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.base.iter().chain(self.translated.iter()).copied()
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

// Name parts come first so other names can share them.
const PERSON_TRANSLATED: &[&str] = &[
  "name",
  "family_name",
  "given_name",
  "additional_name",
  "honorific_prefix",
  "honorific_suffix",
  "patronymic_name",
  "sort_name",
  "summary",
  "biography",
  "national_identity",
];

const PERSON_NAMES: &[&str] = PERSON_TRANSLATED.split_at(7).0;

static PERSON: EntitySchema = EntitySchema {
  kind:       EntityKind::Person,
  base:       &["email", "gender", "birth_date", "death_date", "image"],
  translated: PERSON_TRANSLATED,
  required:   &["name"],
};

static AREA: EntitySchema = EntitySchema {
  kind:       EntityKind::Area,
  base:       &["identifier", "parent_id"],
  translated: &["name", "classification"],
  required:   &["name"],
};

/// A position within an organization, optionally tied to an area.
static POST: EntitySchema = EntitySchema {
  kind:       EntityKind::Post,
  base:       &["organization_id", "area_id", "start_date", "end_date"],
  translated: &["label", "role"],
  required:   &["label"],
};

static LINK: EntitySchema = EntitySchema {
  kind:       EntityKind::Link,
  base:       &["label", "field", "url"],
  translated: &["note"],
  required:   &["url"],
};

static CONTACT: EntitySchema = EntitySchema {
  kind:       EntityKind::Contact,
  base:       &["type", "value", "valid_from", "valid_until"],
  translated: &["label", "note"],
  required:   &["type", "value"],
};

static IDENTIFIER: EntitySchema = EntitySchema {
  kind:       EntityKind::Identifier,
  base:       &["identifier"],
  translated: &["scheme"],
  required:   &["identifier", "scheme"],
};

// Name parts vary by language; validity dates do not.
static OTHER_NAME: EntitySchema = EntitySchema {
  kind:       EntityKind::OtherName,
  base:       &["start_date", "end_date", "note"],
  translated: PERSON_NAMES,
  required:   &["name"],
};
