//! [`SqliteStore`], the SQLite implementation of [`EntityStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, types::Value};

use popit_core::{
  entity::Entity,
  identity::EntityId,
  schema::{AttributeScope, EntityKind},
  store::{EntityQuery, EntityStore},
};

use crate::{
  Result,
  encode::{EncodedEntity, RawEntity, RawTranslation},
  schema::SCHEMA,
};

const ENTITY_COLUMNS: &str =
  "e.kind, e.id, e.owner_kind, e.owner_id, e.attributes, e.created_at, e.updated_at";

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn read_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntity> {
  Ok(RawEntity {
    kind:       row.get(0)?,
    id:         row.get(1)?,
    owner_kind: row.get(2)?,
    owner_id:   row.get(3)?,
    attributes: row.get(4)?,
    created_at: row.get(5)?,
    updated_at: row.get(6)?,
  })
}

fn load_translations(
  conn: &rusqlite::Connection,
  kind: &str,
  id: &str,
) -> rusqlite::Result<Vec<RawTranslation>> {
  let mut stmt = conn.prepare_cached(
    "SELECT language, attributes FROM translations
     WHERE kind = ?1 AND entity_id = ?2
     ORDER BY language",
  )?;
  stmt
    .query_map(rusqlite::params![kind, id], |row| {
      Ok(RawTranslation {
        language:   row.get(0)?,
        attributes: row.get(1)?,
      })
    })?
    .collect()
}

/// The row stored under `(kind, id)` with its translations, if any.
fn read_one(
  conn: &rusqlite::Connection,
  kind: &str,
  id: &str,
) -> rusqlite::Result<Option<(RawEntity, Vec<RawTranslation>)>> {
  let row = conn
    .query_row(
      &format!("SELECT {ENTITY_COLUMNS} FROM entities e WHERE e.kind = ?1 AND e.id = ?2"),
      rusqlite::params![kind, id],
      read_entity,
    )
    .optional()?;
  match row {
    Some(raw) => {
      let translations = load_translations(conn, &raw.kind, &raw.id)?;
      Ok(Some((raw, translations)))
    }
    None => Ok(None),
  }
}

/// Upsert an encoded entity and replace its translation rows.
///
/// On conflict only the attributes and `updated_at` change: the owner and
/// `created_at` of an existing row are never rewritten, and `updated_at`
/// never moves backwards.
fn write_row(conn: &rusqlite::Connection, row: &EncodedEntity) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO entities (
       kind, id, owner_kind, owner_id, attributes, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT (kind, id) DO UPDATE SET
       attributes = excluded.attributes,
       updated_at = MAX(entities.updated_at, excluded.updated_at)",
    rusqlite::params![
      row.kind,
      row.id,
      row.owner_kind,
      row.owner_id,
      row.attributes,
      row.created_at,
      row.updated_at,
    ],
  )?;
  conn.execute(
    "DELETE FROM translations WHERE kind = ?1 AND entity_id = ?2",
    rusqlite::params![row.kind, row.id],
  )?;
  let mut stmt = conn.prepare_cached(
    "INSERT INTO translations (kind, entity_id, language, attributes)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for (language, attributes) in &row.translations {
    stmt.execute(rusqlite::params![row.kind, row.id, language, attributes])?;
  }
  Ok(())
}

/// Merge `entity` over the row already stored under its id and stamp it.
fn prepare_save(
  mut entity: Entity,
  previous: Option<(RawEntity, Vec<RawTranslation>)>,
) -> Result<(Entity, EncodedEntity)> {
  if let Some((raw, translations)) = previous {
    entity.carry_over(&raw.into_entity(translations)?)?;
  }
  // Stored timestamps have microsecond precision; match it so the returned
  // entity equals what a later read yields.
  entity.touch(Utc::now().trunc_subsecs(6));
  let row = EncodedEntity::from_entity(&entity)?;
  Ok((entity, row))
}

/// Build the `SELECT` for an [`EntityQuery`] together with its positional
/// parameters.
fn build_query(query: &EntityQuery) -> Result<(String, Vec<Value>)> {
  let mut params: Vec<Value> = vec![query.kind.tag().to_owned().into()];
  let mut conds: Vec<String> = vec!["e.kind = ?1".to_owned()];

  fn bind(params: &mut Vec<Value>, value: impl Into<Value>) -> usize {
    params.push(value.into());
    params.len()
  }

  if let Some(owner) = &query.owner {
    let k = bind(&mut params, owner.kind.tag().to_owned());
    let i = bind(&mut params, owner.id.to_string());
    conds.push(format!("e.owner_kind = ?{k} AND e.owner_id = ?{i}"));
  }

  for (scope, filter) in query.scoped_filters()? {
    // Names come from the static schema, so they are safe inside a JSON path.
    let path = bind(&mut params, format!("$.{}", filter.name));
    let value = bind(&mut params, filter.value.clone());
    match (scope, &query.language) {
      (AttributeScope::Base, _) => {
        conds.push(format!("json_extract(e.attributes, ?{path}) = ?{value}"));
      }
      (AttributeScope::Translated, Some(language)) => {
        let lang = bind(&mut params, language.to_string());
        conds.push(format!(
          "EXISTS (SELECT 1 FROM translations t
                   WHERE t.kind = e.kind AND t.entity_id = e.id
                     AND t.language = ?{lang}
                     AND json_extract(t.attributes, ?{path}) = ?{value})"
        ));
      }
      (AttributeScope::Translated, None) => {
        conds.push(format!(
          "EXISTS (SELECT 1 FROM translations t
                   WHERE t.kind = e.kind AND t.entity_id = e.id
                     AND json_extract(t.attributes, ?{path}) = ?{value})"
        ));
      }
    }
  }

  // SQLite integers are i64. A negative LIMIT means "no limit"; an offset
  // past i64::MAX can only ever skip everything.
  let limit = query
    .limit
    .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
  let offset = query
    .offset
    .map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
  let limit = bind(&mut params, limit);
  let offset = bind(&mut params, offset);

  let sql = format!(
    "SELECT {ENTITY_COLUMNS}
     FROM entities e
     WHERE {}
     ORDER BY e.created_at, e.rowid
     LIMIT ?{limit} OFFSET ?{offset}",
    conds.join(" AND ")
  );
  Ok((sql, params))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Popolo entity store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = crate::Error;

  async fn save(&self, mut entity: Entity) -> Result<Entity> {
    let id = entity.ensure_id().clone();
    let kind = entity.kind();
    let id_str = id.to_string();

    // The previous row is read in the same transaction as the upsert, so
    // two saves of one id cannot both believe they are first.
    let saved = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let previous = read_one(&tx, kind.tag(), &id_str)?;
        let (entity, row) = match prepare_save(entity, previous) {
          Ok(prepared) => prepared,
          Err(e) => return Ok(Err(e)),
        };
        write_row(&tx, &row)?;
        tx.commit()?;
        Ok(Ok(entity))
      })
      .await??;

    tracing::debug!(%kind, %id, "entity saved");
    Ok(saved)
  }

  async fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
    let kind_str = kind.tag();
    let id_str = id.to_string();

    let raw: Option<(RawEntity, Vec<RawTranslation>)> = self
      .conn
      .call(move |conn| {
        // One read transaction so the row and its translations agree.
        let tx = conn.transaction()?;
        let out = read_one(&tx, kind_str, &id_str)?;
        tx.commit()?;
        Ok(out)
      })
      .await?;

    raw.map(|(r, t)| r.into_entity(t)).transpose()
  }

  async fn query(&self, query: &EntityQuery) -> Result<Vec<Entity>> {
    let (sql, params) = build_query(query)?;

    let raws: Vec<(RawEntity, Vec<RawTranslation>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let rows = {
          let mut stmt = tx.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params_from_iter(params.iter()), read_entity)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut out = Vec::with_capacity(rows.len());
        for raw in rows {
          let translations = load_translations(&tx, &raw.kind, &raw.id)?;
          out.push((raw, translations));
        }
        tx.commit()?;
        Ok(out)
      })
      .await?;

    raws
      .into_iter()
      .map(|(r, t)| r.into_entity(t))
      .collect()
  }

  async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<bool> {
    let kind_str = kind.tag();
    let id_str = id.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM translations WHERE kind = ?1 AND entity_id = ?2",
          rusqlite::params![kind_str, id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
          rusqlite::params![kind_str, id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    if deleted {
      tracing::debug!(%kind, %id, "entity deleted");
    }
    Ok(deleted)
  }
}
