//! `catalog-core` — shared building blocks for the product catalog.
//!
//! This crate contains **pure domain** primitives (no IO, no HTTP, no storage).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::ProductId;
