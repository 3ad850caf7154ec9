//! Core types and trait definitions for the Popolo entity store.
//!
//! Every Popolo record (people, areas, and the links, contacts, identifiers
//! and other names hanging off them) is one generic [`entity::Entity`] whose
//! attribute set is declared statically per [`schema::EntityKind`]. Citations
//! are [`schema::EntityKind::Link`] records attached to any entity through a
//! polymorphic [`owner::OwnerRef`].
//!
//! This crate is deliberately free of HTTP and database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod citation;
pub mod entity;
pub mod error;
pub mod identity;
pub mod language;
pub mod owner;
pub mod schema;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
