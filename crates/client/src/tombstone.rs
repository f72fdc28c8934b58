//! Locally persisted deletion markers ("tombstones").
//!
//! A tombstone vetoes a product id on this client: once recorded, the id is
//! filtered out of every catalog load, whatever the server still returns.
//! The set is append-only; there is no un-delete path.
//!
//! Every backend persists the set the same way: one named slot
//! ([`TOMBSTONE_SLOT`]) holding a JSON array of ids.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use catalog_core::ProductId;

/// Name of the persisted slot holding the tombstone list.
pub const TOMBSTONE_SLOT: &str = "deletedProductIds";

#[derive(Debug, thiserror::Error)]
pub enum TombstoneError {
    #[error("tombstone storage error: {0}")]
    Storage(String),
    #[error("failed to encode tombstones: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<anyhow::Error> for TombstoneError {
    fn from(err: anyhow::Error) -> Self {
        TombstoneError::Storage(format!("{err:#}"))
    }
}

#[async_trait]
pub trait TombstoneStore: Send + Sync {
    /// Currently persisted tombstones.
    ///
    /// Never fails: missing or unreadable content is an empty set.
    async fn load(&self) -> BTreeSet<ProductId>;

    /// Add `id` to the persisted set. Recording an id twice is a no-op.
    async fn record(&self, id: ProductId) -> Result<(), TombstoneError>;
}

/// Parse the slot's content, treating anything unusable as "no tombstones".
pub(crate) fn decode_slot(raw: Option<&str>) -> BTreeSet<ProductId> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };

    match serde_json::from_str::<Vec<ProductId>>(raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(err) => {
            tracing::warn!(slot = TOMBSTONE_SLOT, "ignoring unparseable tombstone list: {err}");
            BTreeSet::new()
        }
    }
}

pub(crate) fn encode_slot(ids: &BTreeSet<ProductId>) -> Result<String, TombstoneError> {
    Ok(serde_json::to_string(ids)?)
}

/// In-memory tombstone store.
///
/// Holds the raw slot text rather than a set, so tests can seed it with the
/// same (possibly broken) content a real backend would hold.
#[derive(Debug, Default)]
pub struct InMemoryTombstoneStore {
    slot: RwLock<Option<String>>,
}

impl InMemoryTombstoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let set: BTreeSet<ProductId> = ids.into_iter().collect();
        Self::with_raw(serde_json::to_string(&set).unwrap_or_else(|_| "[]".to_string()))
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: RwLock::new(Some(raw.into())),
        }
    }

    /// Raw slot content, as a persistent backend would hold it.
    pub fn raw(&self) -> Option<String> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl TombstoneStore for InMemoryTombstoneStore {
    async fn load(&self) -> BTreeSet<ProductId> {
        match self.slot.read() {
            Ok(slot) => decode_slot(slot.as_deref()),
            Err(_) => {
                tracing::warn!("tombstone slot lock poisoned; treating as empty");
                BTreeSet::new()
            }
        }
    }

    async fn record(&self, id: ProductId) -> Result<(), TombstoneError> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| TombstoneError::Storage("lock poisoned".to_string()))?;

        let mut ids = decode_slot(slot.as_deref());
        if !ids.insert(id) && slot.is_some() {
            return Ok(());
        }

        *slot = Some(encode_slot(&ids)?);
        Ok(())
    }
}
