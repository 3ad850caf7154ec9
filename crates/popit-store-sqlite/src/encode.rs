//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that SQL string comparison orders them in time.
//! Attribute records are stored as compact JSON objects.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use popit_core::{
  entity::{AttributeRecord, Entity, StoredEntity},
  identity::EntityId,
  language::LanguageCode,
  owner::OwnerRef,
  schema::EntityKind,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Attribute records ───────────────────────────────────────────────────────

pub fn encode_record(record: &AttributeRecord) -> Result<String> {
  Ok(serde_json::to_string(record)?)
}

pub fn decode_record(s: &str) -> Result<AttributeRecord> {
  Ok(serde_json::from_str(s)?)
}

// ─── Outgoing rows ───────────────────────────────────────────────────────────

/// An entity flattened to column values, ready to be moved onto the database
/// thread.
pub struct EncodedEntity {
  pub kind:         &'static str,
  pub id:           String,
  pub owner_kind:   Option<&'static str>,
  pub owner_id:     Option<String>,
  pub attributes:   String,
  pub created_at:   String,
  pub updated_at:   String,
  /// `(language, attributes_json)` pairs.
  pub translations: Vec<(String, String)>,
}

impl EncodedEntity {
  /// Encode a saved entity. Fails if the id or timestamps have not been
  /// assigned yet.
  pub fn from_entity(entity: &Entity) -> Result<Self> {
    let unsaved = || popit_core::Error::NotSaved(entity.kind());
    let id = entity.id().ok_or_else(unsaved)?;
    let created_at = entity.created_at().ok_or_else(unsaved)?;
    let updated_at = entity.updated_at().ok_or_else(unsaved)?;

    let translations = entity
      .translations()
      .iter()
      .map(|(lang, record)| Ok((lang.to_string(), encode_record(record)?)))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      kind: entity.kind().tag(),
      id: id.to_string(),
      owner_kind: entity.owner().map(|o| o.kind.tag()),
      owner_id: entity.owner().map(|o| o.id.to_string()),
      attributes: encode_record(entity.base())?,
      created_at: encode_dt(created_at),
      updated_at: encode_dt(updated_at),
      translations,
    })
  }
}

// ─── Incoming rows ───────────────────────────────────────────────────────────

/// Raw strings read directly from an `entities` row.
pub struct RawEntity {
  pub kind:       String,
  pub id:         String,
  pub owner_kind: Option<String>,
  pub owner_id:   Option<String>,
  pub attributes: String,
  pub created_at: String,
  pub updated_at: String,
}

/// Raw strings read directly from a `translations` row.
pub struct RawTranslation {
  pub language:   String,
  pub attributes: String,
}

impl RawEntity {
  pub fn into_entity(self, translations: Vec<RawTranslation>) -> Result<Entity> {
    let owner = match (self.owner_kind, self.owner_id) {
      (Some(kind), Some(id)) => Some(OwnerRef {
        kind: EntityKind::from_tag(&kind)?,
        id:   EntityId::new(id)?,
      }),
      _ => None,
    };

    let translations = translations
      .into_iter()
      .map(|t| Ok((LanguageCode::new(t.language)?, decode_record(&t.attributes)?)))
      .collect::<Result<BTreeMap<_, _>>>()?;

    let entity = Entity::restore(StoredEntity {
      id: EntityId::new(self.id)?,
      kind: EntityKind::from_tag(&self.kind)?,
      owner,
      base: decode_record(&self.attributes)?,
      translations,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })?;
    Ok(entity)
  }
}
