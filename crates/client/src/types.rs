//! Shared types handed to the presentation layer.
//!
//! These are plain serde types so a UI shell can forward them as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_core::ProductId;

/// Lifecycle of a [`CatalogController`](crate::controller::CatalogController).
///
/// `Idle → Loading → Ready`, then `Ready → Deleting → Ready` per batch.
/// `LoadError` is terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerStatus {
    Idle,
    Loading,
    Ready,
    Deleting,
    LoadError,
}

impl ControllerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerStatus::Idle => "Idle",
            ControllerStatus::Loading => "Loading",
            ControllerStatus::Ready => "Ready",
            ControllerStatus::Deleting => "Deleting",
            ControllerStatus::LoadError => "LoadError",
        }
    }
}

/// A fully committed batch deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Correlates the batch's log lines.
    pub batch_id: Uuid,
    /// Ids deleted server-side, tombstoned and removed from the catalog.
    pub deleted: Vec<ProductId>,
    pub completed_at: DateTime<Utc>,
}
