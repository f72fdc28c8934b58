use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use catalog_client::{
    CatalogController, CatalogError, ClientConfig, CommitPolicy, ControllerStatus,
    HttpProductService, ProductService, SaveResponse, ServiceError, SqliteTombstoneStore,
    TombstoneStore,
};
use catalog_core::ProductId;
use catalog_products::{Category, ProductDraft};

#[derive(Clone, Default)]
struct FakeCatalogServer {
    products: Arc<Mutex<Vec<Value>>>,
    failing_deletes: Arc<Mutex<BTreeSet<i64>>>,
    /// When set, deletes answer 200 but keep the product listed.
    ignore_deletes: Arc<Mutex<bool>>,
    list_failure: Arc<Mutex<Option<StatusCode>>>,
}

async fn list_products(State(srv): State<FakeCatalogServer>) -> Response {
    if let Some(status) = *srv.list_failure.lock().unwrap() {
        return (status, "database unavailable").into_response();
    }
    let products = srv.products.lock().unwrap().clone();
    Json(Value::Array(products)).into_response()
}

async fn save_product(State(srv): State<FakeCatalogServer>, Json(mut body): Json<Value>) -> Response {
    if body["Sku"] == "DUPLICATE" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "SKU already exists" })),
        )
            .into_response();
    }

    let mut products = srv.products.lock().unwrap();
    let next_id = products.iter().filter_map(|p| p["Id"].as_i64()).max().unwrap_or(0) + 1;
    body["Id"] = json!(next_id);
    products.push(body.clone());
    Json(body).into_response()
}

async fn delete_product(State(srv): State<FakeCatalogServer>, Path(id): Path<i64>) -> StatusCode {
    if srv.failing_deletes.lock().unwrap().contains(&id) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if *srv.ignore_deletes.lock().unwrap() {
        return StatusCode::OK;
    }

    let mut products = srv.products.lock().unwrap();
    let before = products.len();
    products.retain(|p| p["Id"].as_i64() != Some(id));
    if products.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

struct TestServer {
    base_url: String,
    state: FakeCatalogServer,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(products: Value) -> Self {
        catalog_observability::init_for_tests();

        let state = FakeCatalogServer::default();
        if let Value::Array(items) = products {
            *state.products.lock().unwrap() = items;
        }

        let app = Router::new()
            .route("/api/products/", get(list_products))
            .route("/api/products/save", post(save_product))
            .route("/api/products/:id/delete", delete(delete_product))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
    }

    fn service(&self) -> HttpProductService {
        HttpProductService::new(&self.config())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn pid(raw: i64) -> ProductId {
    ProductId::new(raw)
}

fn scenario() -> Value {
    json!([
        { "Id": 1, "Sku": "FUR-1", "name": "Table", "Price": 120, "Height": 10, "Width": 5, "Length": 2, "Size": null, "Weight": null },
        { "Id": 2, "Sku": "BK-1", "name": "Novel", "Price": "9.50", "Height": null, "Width": null, "Length": null, "Size": null, "Weight": "3" },
        { "Id": 3, "Sku": "DVD-1", "name": "Film", "Price": 5, "Size": 700 },
        { "Id": 4, "Sku": "MISC-1", "name": "Gift card", "Price": 25 }
    ])
}

#[tokio::test]
async fn lists_products_from_service() {
    let srv = TestServer::spawn(scenario()).await;

    let products = srv.service().list_products().await.unwrap();

    assert_eq!(products.len(), 4);
    assert_eq!(products[1].price, 9.5);
    assert_eq!(products[1].weight, Some(3.0));
    assert_eq!(products[2].size, Some(700.0));
    assert_eq!(products[3].height, None);
}

#[tokio::test]
async fn free_text_attributes_do_not_sink_the_catalog() {
    let srv = TestServer::spawn(json!([
        { "Id": 1, "Sku": "FUR-1", "name": "Table", "Price": 120, "Height": 10, "Width": 5, "Length": 2 },
        { "Id": 2, "Sku": "DVD-9", "name": "Bootleg", "Price": 3, "Size": "700 MB" },
        { "Id": 3, "Sku": "BK-1", "name": "Novel", "Price": 9, "Weight": 3 }
    ]))
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = srv.config().with_storage_path(dir.path().join("storage.db"));

    let mut ctl = CatalogController::from_config(&config).unwrap();
    let catalog = ctl.load().await.unwrap();

    assert_eq!(catalog.ids(Category::Furniture), vec![pid(1)]);
    assert_eq!(catalog.ids(Category::Books), vec![pid(3)]);
    assert!(catalog.dvd().is_empty());
    assert_eq!(ctl.status(), ControllerStatus::Ready);
}

#[tokio::test]
async fn listing_error_status_is_an_api_error() {
    let srv = TestServer::spawn(scenario()).await;
    *srv.state.list_failure.lock().unwrap() = Some(StatusCode::SERVICE_UNAVAILABLE);

    let err = srv.service().list_products().await.unwrap_err();

    assert_eq!(err, ServiceError::Api(503, "database unavailable".to_string()));
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = HttpProductService::new(&ClientConfig::new(format!("http://{addr}/api")));
    let err = service.list_products().await.unwrap_err();

    assert!(matches!(err, ServiceError::Network(_)));
}

#[tokio::test]
async fn save_returns_stored_product() {
    let srv = TestServer::spawn(scenario()).await;
    let draft = ProductDraft::new("DVD-2", "Documentary", 7.0).with_size(4200.0);

    let response = srv.service().save_product(&draft).await.unwrap();

    match response {
        SaveResponse::Saved(product) => {
            assert_eq!(product.id, pid(5));
            assert_eq!(product.sku, "DVD-2");
            assert_eq!(product.size, Some(4200.0));
        }
        other => panic!("Expected Saved, got {other:?}"),
    }
}

#[tokio::test]
async fn save_rejection_carries_server_message() {
    let srv = TestServer::spawn(scenario()).await;
    let draft = ProductDraft::new("DUPLICATE", "Again", 1.0).with_weight(1.0);

    let response = srv.service().save_product(&draft).await.unwrap();

    assert_eq!(
        response,
        SaveResponse::Rejected {
            status: 400,
            message: "SKU already exists".to_string(),
        }
    );
}

#[tokio::test]
async fn delete_maps_status_codes() {
    let srv = TestServer::spawn(scenario()).await;
    srv.state.failing_deletes.lock().unwrap().insert(2);
    let service = srv.service();

    service.delete_product(pid(1)).await.unwrap();
    assert!(matches!(service.delete_product(pid(2)).await, Err(ServiceError::Api(500, _))));
    assert!(matches!(service.delete_product(pid(99)).await, Err(ServiceError::Api(404, _))));
}

#[tokio::test]
async fn controller_round_trip_over_http_and_sqlite() {
    let srv = TestServer::spawn(scenario()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = srv.config().with_storage_path(dir.path().join("storage.db"));

    let mut ctl = CatalogController::from_config(&config).unwrap();
    let catalog = ctl.load().await.unwrap();
    assert_eq!(catalog.ids(Category::Furniture), vec![pid(1)]);
    assert_eq!(catalog.ids(Category::Books), vec![pid(2)]);
    assert_eq!(catalog.ids(Category::Dvd), vec![pid(3)]);
    assert_eq!(ctl.state().unwrap().len(), 4);

    ctl.toggle_select(pid(1));
    ctl.toggle_select(pid(3));
    let outcome = ctl.delete_selected().await.unwrap();
    assert_eq!(outcome.deleted, vec![pid(1), pid(3)]);
    assert_eq!(ctl.catalog().unwrap().len(), 1);

    let tombstones = SqliteTombstoneStore::from_config(&config).unwrap();
    assert_eq!(tombstones.load().await, BTreeSet::from([pid(1), pid(3)]));
}

#[tokio::test]
async fn tombstones_hide_products_the_server_still_lists() {
    let srv = TestServer::spawn(scenario()).await;
    *srv.state.ignore_deletes.lock().unwrap() = true;
    let dir = tempfile::tempdir().unwrap();
    let config = srv.config().with_storage_path(dir.path().join("storage.db"));

    let mut first = CatalogController::from_config(&config).unwrap();
    first.load().await.unwrap();
    first.toggle_select(pid(2));
    first.delete_selected().await.unwrap();

    // A fresh session over the same storage: the server still returns 2.
    let mut second = CatalogController::from_config(&config).unwrap();
    let catalog = second.load().await.unwrap();
    assert!(catalog.books().is_empty());
    assert!(!catalog.contains(pid(2)));
    assert_eq!(srv.state.products.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn partial_failure_over_http_commits_nothing() {
    let srv = TestServer::spawn(scenario()).await;
    srv.state.failing_deletes.lock().unwrap().insert(3);
    let dir = tempfile::tempdir().unwrap();
    let config = srv
        .config()
        .with_storage_path(dir.path().join("storage.db"))
        .with_commit_policy(CommitPolicy::AllOrNothing);

    let mut ctl = CatalogController::from_config(&config).unwrap();
    ctl.load().await.unwrap();
    ctl.toggle_select(pid(1));
    ctl.toggle_select(pid(3));

    let err = ctl.delete_selected().await.unwrap_err();

    assert_eq!(
        err,
        CatalogError::BatchDelete {
            failed: vec![pid(3)],
            succeeded: vec![pid(1)],
        }
    );
    assert_eq!(ctl.status(), ControllerStatus::Ready);
    assert!(ctl.selection().is_empty());
    assert!(ctl.catalog().unwrap().contains(pid(1)));
    let tombstones = SqliteTombstoneStore::from_config(&config).unwrap();
    assert!(tombstones.load().await.is_empty());
    // The server did delete 1: client and server now disagree.
    assert_eq!(srv.state.products.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn load_failure_over_http_is_reported() {
    let srv = TestServer::spawn(scenario()).await;
    *srv.state.list_failure.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
    let dir = tempfile::tempdir().unwrap();
    let config = srv.config().with_storage_path(dir.path().join("storage.db"));

    let mut ctl = CatalogController::from_config(&config).unwrap();
    let err = ctl.load().await.unwrap_err();

    assert!(matches!(err, CatalogError::Fetch(ServiceError::Api(500, _))));
    assert_eq!(ctl.status(), ControllerStatus::LoadError);
}
