//! Batch deletion: many independent deletes, one commit decision.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use catalog_core::ProductId;

use crate::catalog::CatalogState;
use crate::config::CommitPolicy;
use crate::error::{CatalogError, CatalogResult};
use crate::service::ProductService;
use crate::tombstone::TombstoneStore;
use crate::types::BatchOutcome;

/// Sends one delete per id, all at once, and commits the results locally.
///
/// Nothing local is touched until every request has settled. What gets
/// committed then depends on the [`CommitPolicy`]:
/// - `AllOrNothing`: everything if all succeeded, otherwise nothing.
/// - `PerItem`: every id whose delete succeeded.
///
/// Committing an id means recording its tombstone and removing it from the
/// in-memory catalog; all removals happen in a single catalog update.
pub struct BatchDeletionCoordinator {
    service: Arc<dyn ProductService>,
    tombstones: Arc<dyn TombstoneStore>,
    policy: CommitPolicy,
}

impl BatchDeletionCoordinator {
    pub fn new(
        service: Arc<dyn ProductService>,
        tombstones: Arc<dyn TombstoneStore>,
        policy: CommitPolicy,
    ) -> Self {
        Self {
            service,
            tombstones,
            policy,
        }
    }

    /// Delete `ids` remotely and commit the outcome into `catalog`.
    pub async fn delete_all(
        &self,
        ids: &BTreeSet<ProductId>,
        catalog: &mut CatalogState,
    ) -> CatalogResult<BatchOutcome> {
        if ids.is_empty() {
            return Err(CatalogError::EmptySelection);
        }

        let batch_id = Uuid::now_v7();
        let span = tracing::info_span!(
            "batch_delete",
            %batch_id,
            count = ids.len(),
            policy = self.policy.as_str()
        );

        self.run(batch_id, ids, catalog).instrument(span).await
    }

    async fn run(
        &self,
        batch_id: Uuid,
        ids: &BTreeSet<ProductId>,
        catalog: &mut CatalogState,
    ) -> CatalogResult<BatchOutcome> {
        for id in ids.iter().filter(|id| !catalog.contains(**id)) {
            tracing::warn!(%id, "deleting a product that is not in the catalog");
        }

        let requests = ids.iter().map(|&id| async move {
            let result = self.service.delete_product(id).await;
            (id, result)
        });

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in join_all(requests).await {
            match result {
                Ok(()) => succeeded.push(id),
                Err(err) => {
                    tracing::warn!(%id, "delete failed: {err}");
                    failed.push(id);
                }
            }
        }

        let commit_now = match self.policy {
            CommitPolicy::AllOrNothing => failed.is_empty(),
            CommitPolicy::PerItem => !succeeded.is_empty(),
        };

        if commit_now {
            self.commit(&succeeded, catalog).await;
        } else if !succeeded.is_empty() {
            tracing::warn!(
                server_deleted = ?succeeded,
                "batch rolled back locally; these products are gone server-side but still listed"
            );
        }

        if !failed.is_empty() {
            tracing::info!(
                failed = failed.len(),
                succeeded = succeeded.len(),
                "batch delete failed"
            );
            return Err(CatalogError::BatchDelete { failed, succeeded });
        }

        tracing::info!(deleted = succeeded.len(), "batch delete committed");
        Ok(BatchOutcome {
            batch_id,
            deleted: succeeded,
            completed_at: Utc::now(),
        })
    }

    async fn commit(&self, ids: &[ProductId], catalog: &mut CatalogState) {
        for &id in ids {
            if let Err(err) = self.tombstones.record(id).await {
                tracing::error!(%id, "failed to record tombstone: {err}");
            }
        }

        let removed = catalog.remove_all(&ids.iter().copied().collect());
        tracing::debug!(removed, "catalog updated");
    }
}
