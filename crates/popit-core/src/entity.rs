//! The generic translatable entity.
//!
//! An [`Entity`] has a language-invariant base record and at most one
//! attribute record per language. Which attribute lives where is decided by
//! the kind's [`EntitySchema`](crate::schema::EntitySchema); the struct itself
//! is shared by every kind.
//!
//! The active language is never stored on the entity. Every language-dependent
//! call takes it as a parameter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  identity::{EntityId, new_id},
  language::LanguageCode,
  owner::OwnerRef,
  schema::{AttributeScope, EntityKind, EntitySchema},
};

/// Attribute name → value. An absent key is null.
pub type AttributeRecord = BTreeMap<String, String>;

/// Attribute name → new value for updates; `None` clears the attribute.
pub type AttributePatch = BTreeMap<String, Option<String>>;

// ─── Entity ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
  id:           Option<EntityId>,
  kind:         EntityKind,
  owner:        Option<OwnerRef>,
  base:         AttributeRecord,
  translations: BTreeMap<LanguageCode, AttributeRecord>,
  created_at:   Option<DateTime<Utc>>,
  updated_at:   Option<DateTime<Utc>>,
}

/// Everything a store persists for one entity, as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredEntity {
  pub id:           EntityId,
  pub kind:         EntityKind,
  pub owner:        Option<OwnerRef>,
  pub base:         AttributeRecord,
  pub translations: BTreeMap<LanguageCode, AttributeRecord>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Entity {
  /// An empty, unsaved entity. Roots must not have an owner; every other
  /// kind must.
  pub fn new(kind: EntityKind, owner: Option<OwnerRef>) -> Result<Self> {
    check_owner_shape(kind, owner.as_ref())?;
    Ok(Self {
      id: None,
      kind,
      owner,
      base: AttributeRecord::new(),
      translations: BTreeMap::new(),
      created_at: None,
      updated_at: None,
    })
  }

  /// Build an unsaved entity from a flat attribute map written under
  /// `language`, then check the kind's required attributes.
  pub fn from_attributes(
    kind: EntityKind,
    owner: Option<OwnerRef>,
    language: &LanguageCode,
    attributes: &AttributePatch,
  ) -> Result<Self> {
    let mut entity = Self::new(kind, owner)?;
    entity.apply_patch(attributes, language)?;
    entity.check_required(language)?;
    Ok(entity)
  }

  /// Rebuild an entity from its persisted form.
  pub fn restore(stored: StoredEntity) -> Result<Self> {
    check_owner_shape(stored.kind, stored.owner.as_ref())?;
    let schema = stored.kind.schema();
    for name in stored.base.keys() {
      if schema.check(name)? != AttributeScope::Base {
        return Err(field_not_exist(stored.kind, name));
      }
    }
    for record in stored.translations.values() {
      for name in record.keys() {
        if schema.check(name)? != AttributeScope::Translated {
          return Err(field_not_exist(stored.kind, name));
        }
      }
    }
    Ok(Self {
      id:           Some(stored.id),
      kind:         stored.kind,
      owner:        stored.owner,
      base:         stored.base,
      translations: stored.translations,
      created_at:   Some(stored.created_at),
      updated_at:   Some(stored.updated_at),
    })
  }

  /// Use a caller-supplied id instead of a generated one.
  pub fn with_id(mut self, id: EntityId) -> Result<Self> {
    if let Some(existing) = &self.id {
      return Err(Error::IdAlreadyAssigned(existing.clone()));
    }
    self.id = Some(id);
    Ok(self)
  }

  // ── Accessors ───────────────────────────────────────────────────────────

  pub fn id(&self) -> Option<&EntityId> { self.id.as_ref() }

  pub fn kind(&self) -> EntityKind { self.kind }

  pub fn schema(&self) -> &'static EntitySchema { self.kind.schema() }

  pub fn owner(&self) -> Option<&OwnerRef> { self.owner.as_ref() }

  pub fn base(&self) -> &AttributeRecord { &self.base }

  pub fn translations(&self) -> &BTreeMap<LanguageCode, AttributeRecord> {
    &self.translations
  }

  pub fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }

  pub fn updated_at(&self) -> Option<DateTime<Utc>> { self.updated_at }

  pub fn is_persisted(&self) -> bool { self.created_at.is_some() }

  /// Languages that have an attribute record.
  pub fn languages(&self) -> impl Iterator<Item = &LanguageCode> {
    self.translations.keys()
  }

  // ── Persistence hooks ───────────────────────────────────────────────────

  /// Assign a fresh id unless one is already set, and return it.
  pub fn ensure_id(&mut self) -> &EntityId {
    self.id.get_or_insert_with(new_id)
  }

  /// Prepare an entity for saving over `previous`, the row already stored
  /// under the same id: keeps its `created_at` and `updated_at` floor and
  /// refuses to change the owner.
  pub fn carry_over(&mut self, previous: &Entity) -> Result<()> {
    if self.owner != previous.owner {
      return Err(Error::OwnerChanged(self.kind));
    }
    self.created_at = previous.created_at;
    self.updated_at = match (self.updated_at, previous.updated_at) {
      (Some(a), Some(b)) => Some(a.max(b)),
      (a, b) => a.or(b),
    };
    Ok(())
  }

  /// Record a save at `now`. `created_at` is set once; `updated_at` never
  /// moves backwards.
  pub fn touch(&mut self, now: DateTime<Utc>) {
    let created = *self.created_at.get_or_insert(now);
    let floor = self.updated_at.unwrap_or(created);
    self.updated_at = Some(now.max(floor));
  }

  // ── Attributes ──────────────────────────────────────────────────────────

  pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> {
    self.schema().attribute_names()
  }

  pub fn has_attribute(&self, name: &str) -> bool { self.schema().has_attribute(name) }

  /// Read an attribute under `language`.
  ///
  /// Base attributes ignore the language. A translated attribute on an
  /// entity without a record for `language` is [`Error::TranslationMissing`];
  /// falling back to another language is the caller's decision.
  pub fn get_attribute(
    &self,
    name: &str,
    language: &LanguageCode,
  ) -> Result<Option<&str>> {
    match self.schema().check(name)? {
      AttributeScope::Base => Ok(self.base.get(name).map(String::as_str)),
      AttributeScope::Translated => {
        let record = self.translations.get(language).ok_or_else(|| {
          Error::TranslationMissing {
            kind:     self.kind,
            language: language.clone(),
          }
        })?;
        Ok(record.get(name).map(String::as_str))
      }
    }
  }

  /// Read an attribute without any language: translated attributes are
  /// always `None`.
  pub fn untranslated_attribute(&self, name: &str) -> Result<Option<&str>> {
    match self.schema().check(name)? {
      AttributeScope::Base => Ok(self.base.get(name).map(String::as_str)),
      AttributeScope::Translated => Ok(None),
    }
  }

  /// Write an attribute. Translated attributes go to `language`'s record,
  /// which is created if absent. `None` clears the value.
  pub fn set_attribute(
    &mut self,
    name: &str,
    value: Option<String>,
    language: &LanguageCode,
  ) -> Result<()> {
    let record = match self.schema().check(name)? {
      AttributeScope::Base => &mut self.base,
      AttributeScope::Translated => {
        self.translations.entry(language.clone()).or_default()
      }
    };
    match value {
      Some(v) => record.insert(name.to_owned(), v),
      None => record.remove(name),
    };
    Ok(())
  }

  /// Partial update. Every name is validated before anything is written, so
  /// a bad patch leaves the entity untouched.
  pub fn apply_patch(
    &mut self,
    patch: &AttributePatch,
    language: &LanguageCode,
  ) -> Result<()> {
    let schema = self.schema();
    for name in patch.keys() {
      schema.check(name)?;
    }
    for (name, value) in patch {
      self.set_attribute(name, value.clone(), language)?;
    }
    Ok(())
  }

  /// Full update: the base record and `language`'s record are replaced by
  /// `attributes`. Other languages are left alone.
  pub fn replace_attributes(
    &mut self,
    attributes: &AttributePatch,
    language: &LanguageCode,
  ) -> Result<()> {
    let mut next = self.clone();
    next.base.clear();
    next.translations.insert(language.clone(), AttributeRecord::new());
    next.apply_patch(attributes, language)?;
    next.check_required(language)?;
    *self = next;
    Ok(())
  }

  /// Check that every required attribute is set, reading translated ones
  /// under `language`.
  pub fn check_required(&self, language: &LanguageCode) -> Result<()> {
    let schema = self.schema();
    for &field in schema.required {
      let present = match schema.scope(field) {
        Some(AttributeScope::Base) => self.base.contains_key(field),
        Some(AttributeScope::Translated) => self
          .translations
          .get(language)
          .is_some_and(|r| r.contains_key(field)),
        None => false,
      };
      if !present {
        return Err(Error::MissingField { kind: self.kind, field });
      }
    }
    Ok(())
  }

  // ── Views ───────────────────────────────────────────────────────────────

  /// The entity as seen in `language`. Fails if there is no record for it.
  pub fn view(&self, language: &LanguageCode) -> Result<EntityView> {
    let record = self.translations.get(language).ok_or_else(|| {
      Error::TranslationMissing {
        kind:     self.kind,
        language: language.clone(),
      }
    })?;
    Ok(self.build_view(Some((language, record))))
  }

  /// The base attributes only; every translated attribute is null.
  pub fn untranslated(&self) -> EntityView { self.build_view(None) }

  /// The view in the first of `languages` that has a record, otherwise the
  /// untranslated view.
  pub fn view_with_fallback(&self, languages: &[&LanguageCode]) -> EntityView {
    languages
      .iter()
      .find_map(|&l| self.translations.get(l).map(|r| (l, r)))
      .map_or_else(|| self.untranslated(), |found| self.build_view(Some(found)))
  }

  fn build_view(&self, translated: Option<(&LanguageCode, &AttributeRecord)>) -> EntityView {
    let schema = self.schema();
    let mut attributes = BTreeMap::new();
    for &name in schema.base {
      attributes.insert(name, self.base.get(name).cloned());
    }
    for &name in schema.translated {
      attributes.insert(name, translated.and_then(|(_, r)| r.get(name).cloned()));
    }
    EntityView {
      id: self.id.clone(),
      kind: self.kind,
      language: translated.map(|(l, _)| l.clone()),
      owner: self.owner.clone(),
      attributes,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

fn check_owner_shape(kind: EntityKind, owner: Option<&OwnerRef>) -> Result<()> {
  match (kind.is_root(), owner) {
    (true, Some(_)) => Err(Error::UnexpectedOwner(kind)),
    (false, None) => Err(Error::OwnerRequired(kind)),
    _ => Ok(()),
  }
}

fn field_not_exist(kind: EntityKind, name: &str) -> Error {
  Error::FieldNotExist { kind, field: name.to_owned() }
}

// ─── View ────────────────────────────────────────────────────────────────────

/// A flattened, language-resolved read model of an entity. Every declared
/// attribute is present; missing values are null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
  pub id:         Option<EntityId>,
  pub kind:       EntityKind,
  /// The language translated attributes were read in, if any.
  pub language:   Option<LanguageCode>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner:      Option<OwnerRef>,
  #[serde(flatten)]
  pub attributes: BTreeMap<&'static str, Option<String>>,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl EntityView {
  pub fn get(&self, name: &str) -> Option<&str> {
    self.attributes.get(name).and_then(|v| v.as_deref())
  }
}
