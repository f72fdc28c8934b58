//! Entry point for the presentation layer.

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_core::ProductId;
use catalog_products::ProductDraft;

use crate::catalog::{CatalogState, CategorizedCatalog};
use crate::config::{ClientConfig, CommitPolicy};
use crate::deletion::BatchDeletionCoordinator;
use crate::error::{CatalogError, CatalogResult};
use crate::local_storage::SqliteTombstoneStore;
use crate::service::{HttpProductService, ProductService, SaveResponse};
use crate::tombstone::TombstoneStore;
use crate::types::{BatchOutcome, ControllerStatus};

/// Owns the catalog state, the selection, and the controller lifecycle.
///
/// Mutating actions take `&mut self`, so the catalog and selection are never
/// touched by two actions at once.
pub struct CatalogController {
    service: Arc<dyn ProductService>,
    tombstones: Arc<dyn TombstoneStore>,
    deletions: BatchDeletionCoordinator,
    status: ControllerStatus,
    catalog: Option<CatalogState>,
    selection: BTreeSet<ProductId>,
    last_error: Option<CatalogError>,
}

impl CatalogController {
    pub fn new(
        service: Arc<dyn ProductService>,
        tombstones: Arc<dyn TombstoneStore>,
        policy: CommitPolicy,
    ) -> Self {
        let deletions = BatchDeletionCoordinator::new(service.clone(), tombstones.clone(), policy);

        Self {
            service,
            tombstones,
            deletions,
            status: ControllerStatus::Idle,
            catalog: None,
            selection: BTreeSet::new(),
            last_error: None,
        }
    }

    /// HTTP service + SQLite tombstones, as described by `config`.
    ///
    /// The database is opened lazily on first use.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let service = Arc::new(HttpProductService::new(config));
        let tombstones = Arc::new(SqliteTombstoneStore::from_config(config)?);
        tracing::info!(
            api_url = service.base_url(),
            policy = config.commit_policy.as_str(),
            "catalog controller configured"
        );
        Ok(Self::new(service, tombstones, config.commit_policy))
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    /// The categorized catalog, once loaded.
    pub fn catalog(&self) -> Option<&CategorizedCatalog> {
        self.catalog.as_ref().map(CatalogState::categorized)
    }

    pub fn state(&self) -> Option<&CatalogState> {
        self.catalog.as_ref()
    }

    /// Error raised by the most recent failed action, if it has not been
    /// superseded by a successful one.
    pub fn last_error(&self) -> Option<&CatalogError> {
        self.last_error.as_ref()
    }

    /// Fetch the product list once and reconcile it with the tombstones.
    ///
    /// Only valid from `Idle`. A failed fetch leaves the controller in
    /// `LoadError` for the rest of the session.
    pub async fn load(&mut self) -> CatalogResult<&CategorizedCatalog> {
        if self.status != ControllerStatus::Idle {
            return Err(CatalogError::InvalidState {
                action: "load",
                actual: self.status,
            });
        }

        self.status = ControllerStatus::Loading;

        let products = match self.service.list_products().await {
            Ok(products) => products,
            Err(err) => {
                tracing::error!("catalog load failed: {err}");
                self.status = ControllerStatus::LoadError;
                let err = CatalogError::Fetch(err);
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let tombstones = self.tombstones.load().await;
        let fetched = products.len();
        let state = CatalogState::from_server(products, &tombstones);
        tracing::info!(
            fetched,
            tombstoned = tombstones.len(),
            listed = state.categorized().len(),
            loaded_at = %state.loaded_at(),
            "catalog loaded"
        );

        self.status = ControllerStatus::Ready;
        self.last_error = None;
        Ok(self.catalog.insert(state).categorized())
    }

    /// Flip `id` in or out of the selection. Returns whether it is now selected.
    pub fn toggle_select(&mut self, id: ProductId) -> bool {
        if self.selection.remove(&id) {
            false
        } else {
            self.selection.insert(id);
            true
        }
    }

    pub fn is_selected(&self, id: ProductId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selection(&self) -> &BTreeSet<ProductId> {
        &self.selection
    }

    /// Delete every selected product.
    ///
    /// The selection is cleared whatever the outcome, including a call
    /// rejected because no catalog is loaded; the user has to select again
    /// to retry.
    pub async fn delete_selected(&mut self) -> CatalogResult<BatchOutcome> {
        let selection = std::mem::take(&mut self.selection);

        let catalog = match self.catalog.as_mut() {
            Some(catalog) if self.status == ControllerStatus::Ready => catalog,
            _ => {
                let err = CatalogError::InvalidState {
                    action: "delete",
                    actual: self.status,
                };
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        self.status = ControllerStatus::Deleting;
        let result = self.deletions.delete_all(&selection, catalog).await;
        self.status = ControllerStatus::Ready;

        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.clone()),
        }
        result
    }

    /// Validate `draft` locally, then submit it.
    ///
    /// Nothing is sent if validation fails. The draft is only borrowed, so a
    /// rejected form can be corrected and resubmitted. The loaded catalog is
    /// not patched; reload to see the new product.
    pub async fn create_product(&mut self, draft: &ProductDraft) -> CatalogResult<SaveResponse> {
        let result = self.submit(draft).await;
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.clone()),
        }
        result
    }

    async fn submit(&self, draft: &ProductDraft) -> CatalogResult<SaveResponse> {
        draft.validate()?;

        match self.service.save_product(draft).await {
            Ok(SaveResponse::Rejected { status, message }) => {
                tracing::warn!(status, sku = %draft.sku, "product rejected: {message}");
                Err(CatalogError::CreateRejected { status, message })
            }
            Ok(response) => {
                tracing::info!(sku = %draft.sku, "product saved");
                Ok(response)
            }
            Err(err) => Err(CatalogError::Service(err)),
        }
    }
}
