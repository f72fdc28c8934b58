//! Remote product service: the client's only view of server state.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use catalog_core::ProductId;
use catalog_products::{Product, ProductDraft};

use crate::config::ClientConfig;

const UNKNOWN_REJECTION: &str = "An unknown error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result of submitting a draft to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveResponse {
    /// Stored; the service returned the stored product.
    Saved(Product),
    /// Stored, but the response body was not a product.
    Accepted,
    /// The service refused the draft.
    Rejected { status: u16, message: String },
}

/// Read/create/delete endpoints of the product service.
#[async_trait]
pub trait ProductService: Send + Sync {
    /// `GET /products/`
    async fn list_products(&self) -> Result<Vec<Product>, ServiceError>;

    /// `POST /products/save`
    ///
    /// A refusal by the service is a successful call returning
    /// [`SaveResponse::Rejected`]; only transport failures are errors.
    async fn save_product(&self, draft: &ProductDraft) -> Result<SaveResponse, ServiceError>;

    /// `DELETE /products/{id}/delete`
    async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError>;
}

/// [`ProductService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProductService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductService {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ProductService for HttpProductService {
    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        let url = self.url("products/");
        tracing::debug!(%url, "fetching products");

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ServiceError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        let items: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        Ok(decode_listing(items))
    }

    async fn save_product(&self, draft: &ProductDraft) -> Result<SaveResponse, ServiceError> {
        let url = self.url("products/save");
        tracing::debug!(%url, sku = %draft.sku, "saving product");

        let resp = self
            .client
            .post(&url)
            .json(draft)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        if status.is_success() {
            return Ok(match serde_json::from_str::<Product>(&body) {
                Ok(product) => SaveResponse::Saved(product),
                Err(_) => SaveResponse::Accepted,
            });
        }

        Ok(SaveResponse::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body),
        })
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let url = self.url(&format!("products/{id}/delete"));
        tracing::debug!(%url, "deleting product");

        let resp = self
            .client
            .delete(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ServiceError::Api(
                resp.status().as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        Ok(())
    }
}

/// Decode a product listing one entry at a time.
///
/// The service stores whatever the add-product form sent, so a single entry
/// may carry free text such as `"700 MB"` in a numeric field. Such entries are
/// skipped with a warning; the rest of the listing is kept.
fn decode_listing(items: Vec<Value>) -> Vec<Product> {
    let total = items.len();
    let products: Vec<Product> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let id = item.get("Id").or_else(|| item.get("id")).cloned();
            match serde_json::from_value::<Product>(item) {
                Ok(product) => Some(product),
                Err(err) => {
                    tracing::warn!(index, id = ?id, "skipping undecodable product: {err}");
                    None
                }
            }
        })
        .collect();

    if products.len() < total {
        tracing::warn!(
            skipped = total - products.len(),
            total,
            "product listing contained undecodable entries"
        );
    }
    products
}

/// Pull the human-readable message out of an error payload.
///
/// The service answers `{"error": "..."}`; `{"message": "..."}` is accepted
/// too. Anything else gets a generic message.
fn rejection_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return UNKNOWN_REJECTION.to_string();
    };

    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_REJECTION.to_string())
}

/// Number of calls made against an [`InMemoryProductService`], per endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub save: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list + self.save + self.delete
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    products: Vec<Product>,
    fail_listing: bool,
    failing_deletes: BTreeSet<ProductId>,
    save_rejection: Option<String>,
    calls: CallCounts,
}

/// In-memory product service.
///
/// Intended for tests/dev. Failures can be scripted per endpoint, and every
/// call is counted.
#[derive(Debug, Default)]
pub struct InMemoryProductService {
    state: RwLock<InMemoryState>,
}

impl InMemoryProductService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            state: RwLock::new(InMemoryState {
                products,
                ..InMemoryState::default()
            }),
        }
    }

    /// Make every `list_products` call fail with a 500.
    pub fn fail_listing(&self) {
        if let Ok(mut state) = self.state.write() {
            state.fail_listing = true;
        }
    }

    /// Make `delete_product(id)` fail with a 500 (the product is kept).
    pub fn fail_delete(&self, id: ProductId) {
        if let Ok(mut state) = self.state.write() {
            state.failing_deletes.insert(id);
        }
    }

    /// Make every `save_product` call come back rejected with `message`.
    pub fn reject_saves(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.save_rejection = Some(message.into());
        }
    }

    /// Products currently held "server-side".
    pub fn products(&self) -> Vec<Product> {
        self.state
            .read()
            .map(|state| state.products.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.read().map(|state| state.calls).unwrap_or_default()
    }
}

fn poisoned() -> ServiceError {
    ServiceError::Network("lock poisoned".to_string())
}

#[async_trait]
impl ProductService for InMemoryProductService {
    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.calls.list += 1;

        if state.fail_listing {
            return Err(ServiceError::Api(500, "listing unavailable".to_string()));
        }

        Ok(state.products.clone())
    }

    async fn save_product(&self, draft: &ProductDraft) -> Result<SaveResponse, ServiceError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.calls.save += 1;

        if let Some(message) = &state.save_rejection {
            return Ok(SaveResponse::Rejected {
                status: 400,
                message: message.clone(),
            });
        }

        let next_id = state
            .products
            .iter()
            .map(|p| p.id.get())
            .max()
            .unwrap_or(0)
            + 1;

        let product = Product {
            id: ProductId::new(next_id),
            sku: draft.sku.clone(),
            name: draft.name.clone(),
            price: draft.price.unwrap_or_default(),
            height: draft.height,
            width: draft.width,
            length: draft.length,
            size: draft.size,
            weight: draft.weight,
        };
        state.products.push(product.clone());

        Ok(SaveResponse::Saved(product))
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.calls.delete += 1;

        if state.failing_deletes.contains(&id) {
            return Err(ServiceError::Api(500, format!("failed to delete product {id}")));
        }

        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        if state.products.len() == before {
            return Err(ServiceError::Api(404, format!("product {id} not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_prefers_error_field() {
        assert_eq!(
            rejection_message(r#"{"error": "SKU already exists", "message": "ignored"}"#),
            "SKU already exists"
        );
    }

    #[test]
    fn rejection_message_falls_back_to_message_field() {
        assert_eq!(rejection_message(r#"{"message": "bad price"}"#), "bad price");
    }

    #[test]
    fn rejection_message_defaults_for_unusable_bodies() {
        assert_eq!(rejection_message("<html>oops</html>"), UNKNOWN_REJECTION);
        assert_eq!(rejection_message(r#"{"error": ""}"#), UNKNOWN_REJECTION);
        assert_eq!(rejection_message(r#"{"error": 12}"#), UNKNOWN_REJECTION);
    }

    #[test]
    fn listing_skips_entries_that_do_not_decode() {
        let items: Vec<Value> = serde_json::from_str(
            r#"[
                {"Id": 1, "Sku": "F-1", "name": "Table", "Price": 50, "Height": 10, "Width": 5, "Length": 2},
                {"Id": 2, "Sku": "D-1", "name": "Film", "Price": 5, "Size": "700 MB"},
                {"Id": 3, "Sku": "B-1", "name": "Novel", "Price": "9", "Weight": "3"}
            ]"#,
        )
        .unwrap();

        let products = decode_listing(items);

        let ids: Vec<_> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(3)]);
    }

    #[test]
    fn listing_of_valid_entries_is_kept_in_order() {
        let items = vec![
            serde_json::json!({"Id": 7, "Sku": "A", "name": "A", "Price": 1, "Size": 1}),
            serde_json::json!({"Id": 4, "Sku": "B", "name": "B", "Price": 1}),
        ];

        let products = decode_listing(items);

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, ProductId::new(7));
        assert_eq!(products[1].id, ProductId::new(4));
    }

    #[tokio::test]
    async fn in_memory_service_assigns_ids_and_deletes() {
        let service = InMemoryProductService::with_products(vec![
            Product::new(ProductId::new(4), "A", "A", 1.0).with_size(1.0),
        ]);

        let saved = service
            .save_product(&ProductDraft::new("B", "B", 2.0).with_weight(1.0))
            .await
            .unwrap();
        match saved {
            SaveResponse::Saved(product) => assert_eq!(product.id, ProductId::new(5)),
            other => panic!("Expected Saved, got {other:?}"),
        }

        service.delete_product(ProductId::new(4)).await.unwrap();
        let err = service.delete_product(ProductId::new(4)).await.unwrap_err();
        assert_eq!(err, ServiceError::Api(404, "product 4 not found".to_string()));

        assert_eq!(service.products().len(), 1);
        assert_eq!(service.calls(), CallCounts { list: 0, save: 1, delete: 2 });
    }

    #[tokio::test]
    async fn in_memory_service_scripted_failures() {
        let service = InMemoryProductService::with_products(vec![
            Product::new(ProductId::new(1), "A", "A", 1.0).with_size(1.0),
        ]);
        service.fail_listing();
        service.fail_delete(ProductId::new(1));

        assert!(matches!(service.list_products().await, Err(ServiceError::Api(500, _))));
        assert!(matches!(
            service.delete_product(ProductId::new(1)).await,
            Err(ServiceError::Api(500, _))
        ));
        assert_eq!(service.products().len(), 1);
    }
}
