//! `catalog-client`
//!
//! **Responsibility:** Deletion-aware, categorized view of a remote product catalog.
//!
//! This crate provides:
//! - Locally persisted tombstones for deleted products (in-memory and SQLite backends)
//! - Reconciliation of the server's product list against those tombstones
//! - Concurrent batch deletion with an explicit commit policy
//! - Validated product creation
//!
//! The product service remains the authority on what exists; this crate
//! decides what the user gets to see.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod deletion;
pub mod error;
pub mod local_storage;
pub mod service;
pub mod tombstone;
pub mod types;

pub use catalog::{CatalogState, CategorizedCatalog, reconcile};
pub use config::{ClientConfig, CommitPolicy};
pub use controller::CatalogController;
pub use deletion::BatchDeletionCoordinator;
pub use error::{CatalogError, CatalogResult};
pub use local_storage::SqliteTombstoneStore;
pub use service::{HttpProductService, InMemoryProductService, ProductService, SaveResponse, ServiceError};
pub use tombstone::{InMemoryTombstoneStore, TombstoneError, TombstoneStore};
pub use types::{BatchOutcome, ControllerStatus};
