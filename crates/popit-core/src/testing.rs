//! An in-memory [`EntityStore`] for unit tests.

use std::sync::Mutex;

use chrono::Utc;

use crate::{
  Error, Result,
  entity::Entity,
  identity::EntityId,
  schema::EntityKind,
  store::{EntityQuery, EntityStore},
};

#[derive(Default)]
pub struct MemoryStore {
  rows: Mutex<Vec<Entity>>,
}

impl EntityStore for MemoryStore {
  type Error = Error;

  async fn save(&self, mut entity: Entity) -> Result<Entity> {
    entity.ensure_id();
    let mut rows = self.rows.lock().unwrap();
    let existing = rows
      .iter()
      .position(|e| e.kind() == entity.kind() && e.id() == entity.id());
    match existing {
      Some(i) => {
        entity.carry_over(&rows[i])?;
        entity.touch(Utc::now());
        rows[i] = entity.clone();
      }
      None => {
        entity.touch(Utc::now());
        rows.push(entity.clone());
      }
    }
    Ok(entity)
  }

  async fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>> {
    let rows = self.rows.lock().unwrap();
    Ok(
      rows
        .iter()
        .find(|e| e.kind() == kind && e.id() == Some(id))
        .cloned(),
    )
  }

  async fn query(&self, query: &EntityQuery) -> Result<Vec<Entity>> {
    let rows = self.rows.lock().unwrap();
    let mut out = Vec::new();
    for entity in rows.iter() {
      if query.matches(entity)? {
        out.push(entity.clone());
      }
    }
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(usize::MAX);
    Ok(out.into_iter().skip(offset).take(limit).collect())
  }

  async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<bool> {
    let mut rows = self.rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|e| !(e.kind() == kind && e.id() == Some(id)));
    Ok(rows.len() != before)
  }
}
