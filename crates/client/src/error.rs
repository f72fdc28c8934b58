//! Errors surfaced to the presentation layer.

use thiserror::Error;

use catalog_core::{DomainError, ProductId};

use crate::service::ServiceError;
use crate::types::ControllerStatus;

/// Result type used by the catalog controller and its collaborators.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Everything a catalog action can fail with.
///
/// None of these is fatal: each is recovered from by retrying the action that
/// raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// Loading the product list failed; no partial catalog is shown.
    #[error("failed to fetch products: {0}")]
    Fetch(#[source] ServiceError),

    /// A draft was refused before reaching the network.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The product service refused a draft.
    #[error("product was rejected: {message}")]
    CreateRejected { status: u16, message: String },

    /// At least one delete in a batch failed.
    ///
    /// `succeeded` lists ids the server reported as deleted anyway.
    #[error("failed to delete products {failed:?}")]
    BatchDelete {
        failed: Vec<ProductId>,
        succeeded: Vec<ProductId>,
    },

    /// A batch delete was requested with nothing selected.
    #[error("no products selected")]
    EmptySelection,

    /// The action is not allowed in the controller's current state.
    #[error("cannot {action} while {}", .actual.as_str())]
    InvalidState {
        action: &'static str,
        actual: ControllerStatus,
    },

    /// Transport failure outside of loading (e.g. while saving a draft).
    #[error("product service error: {0}")]
    Service(#[source] ServiceError),
}
