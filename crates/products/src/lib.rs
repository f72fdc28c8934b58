//! Products domain module.
//!
//! This crate contains the catalog's product records and the rules around
//! them, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage):
//! - the wire shape of a product as served by the product service
//! - draft validation at the creation boundary
//! - classification into display categories

pub mod category;
pub mod product;
mod wire;

pub use category::{Category, classify};
pub use product::{Dimensions, Measured, Product, ProductDraft};
