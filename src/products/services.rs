use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::dto::{ListingPayload, Product};
use crate::controllers::{ListController, RestListSource};
use crate::error::ClientError;
use crate::forms::listing::ListingStore;
use crate::http::{unwrap_field, ApiClient};
use crate::state::AppContext;

pub type ProductList = ListController<RestListSource<Product>>;

#[derive(Clone)]
pub struct ProductsApi {
    api: ApiClient,
}

impl ProductsApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Product, ClientError> {
        let value: Value = self.api.get(&format!("/api/products/{}", id)).await?;
        unwrap_field(value, "product")
    }

    #[instrument(skip(self, payload), fields(title = %payload.title, status = payload.status.as_str()))]
    pub async fn create(&self, payload: &ListingPayload) -> Result<Product, ClientError> {
        let value: Value = self.api.post("/api/products", payload).await?;
        let product: Product = unwrap_field(value, "product")?;
        info!(product_id = %product.id, "listing created");
        Ok(product)
    }

    #[instrument(skip(self, payload), fields(status = payload.status.as_str()))]
    pub async fn update(&self, id: &str, payload: &ListingPayload) -> Result<Product, ClientError> {
        let value: Value = self.api.patch(&format!("/api/products/{}", id), payload).await?;
        unwrap_field(value, "product")
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete(&format!("/api/products/{}", id)).await?;
        info!(product_id = id, "listing deleted");
        Ok(())
    }

    pub async fn add_to_wishlist(&self, id: &str) -> Result<(), ClientError> {
        let _: Value = self.api.post(&format!("/api/wishlist/{}", id), &json!({})).await?;
        Ok(())
    }

    pub async fn remove_from_wishlist(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete(&format!("/api/wishlist/{}", id)).await?;
        Ok(())
    }

    pub async fn wishlist(&self) -> Result<Vec<Product>, ClientError> {
        let value: Value = self.api.get("/api/wishlist").await?;
        unwrap_field(value, "wishlist")
    }

    /// Public catalog: approved listings, searchable and filterable.
    pub fn catalog(&self) -> RestListSource<Product> {
        RestListSource::new(self.api.clone(), "/api/products", "products")
    }

    /// The signed-in seller's own listings in every status.
    pub fn mine(&self) -> RestListSource<Product> {
        RestListSource::new(self.api.clone(), "/api/products/mine", "products")
    }
}

#[async_trait]
impl ListingStore for ProductsApi {
    async fn create_listing(&self, payload: &ListingPayload) -> Result<Product, ClientError> {
        self.create(payload).await
    }

    async fn update_listing(&self, id: &str, payload: &ListingPayload) -> Result<Product, ClientError> {
        self.update(id, payload).await
    }
}

/// Catalog page controller, remembering page and filters between runs.
pub fn catalog_list(ctx: &AppContext) -> ProductList {
    let products = ProductsApi::new(ctx.api.clone());
    ListController::new(
        "products",
        products.catalog(),
        ctx.notifier.clone(),
        ctx.remembered_list_options(),
    )
}

pub fn my_listings(ctx: &AppContext) -> ProductList {
    let products = ProductsApi::new(ctx.api.clone());
    ListController::new(
        "dashboard.listings",
        products.mine(),
        ctx.notifier.clone(),
        ctx.remembered_list_options(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    use super::*;
    use crate::products::dto::filters;
    use crate::testkit;

    #[derive(Clone, Default)]
    struct Backend {
        wishlist: Arc<Mutex<Vec<String>>>,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    fn product(id: &str) -> Value {
        json!({ "_id": id, "title": format!("Item {}", id), "price": 10.0, "status": "approved", "seller": "s1" })
    }

    async fn list(State(b): State<Backend>, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        b.queries.lock().unwrap().push(q);
        Json(json!({ "products": [product("p1"), product("p2")], "total": 2 }))
    }

    async fn one(Path(id): Path<String>) -> impl IntoResponse {
        if id == "missing" {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "Product not found" })));
        }
        (StatusCode::OK, Json(json!({ "product": product(&id) })))
    }

    async fn wish_add(State(b): State<Backend>, Path(id): Path<String>) -> impl IntoResponse {
        b.wishlist.lock().unwrap().push(id);
        Json(json!({ "ok": true }))
    }

    async fn wish_remove(State(b): State<Backend>, Path(id): Path<String>) -> impl IntoResponse {
        b.wishlist.lock().unwrap().retain(|w| *w != id);
        StatusCode::NO_CONTENT
    }

    async fn wish_list(State(b): State<Backend>) -> impl IntoResponse {
        let items: Vec<Value> = b.wishlist.lock().unwrap().iter().map(|id| product(id)).collect();
        Json(json!({ "wishlist": items }))
    }

    async fn backend() -> (String, Backend) {
        let state = Backend::default();
        let router = Router::new()
            .route("/api/products", get(list))
            .route("/api/products/:id", get(one))
            .route("/api/wishlist", get(wish_list))
            .route("/api/wishlist/:id", post(wish_add).delete(wish_remove))
            .with_state(state.clone());
        (testkit::spawn_backend(router).await, state)
    }

    #[tokio::test]
    async fn get_unwraps_product_and_surfaces_not_found() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let api = ProductsApi::new(ctx.api.clone());

        let p = api.get("p9").await.expect("product");
        assert_eq!(p.title, "Item p9");

        let err = api.get("missing").await.unwrap_err();
        assert_eq!(err.user_message(), "Product not found");
    }

    #[tokio::test]
    async fn wishlist_add_list_remove() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let api = ProductsApi::new(ctx.api.clone());

        api.add_to_wishlist("p1").await.expect("add");
        api.add_to_wishlist("p2").await.expect("add");
        api.remove_from_wishlist("p1").await.expect("remove");
        let saved = api.wishlist().await.expect("wishlist");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, "p2");
    }

    #[tokio::test]
    async fn catalog_sends_filters_and_remembers_them() {
        let (base, state) = backend().await;
        let ctx = testkit::context(&base);

        let catalog = catalog_list(&ctx);
        catalog.mount();
        catalog.settled().await;
        catalog.set_filter(filters::CATEGORY, Some("electronics"));
        catalog.set_filter(filters::MAX_PRICE, Some("500"));
        catalog.settled().await;

        let last = state.queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.get("category").map(String::as_str), Some("electronics"));
        assert_eq!(last.get("maxPrice").map(String::as_str), Some("500"));
        assert_eq!(last.get("page").map(String::as_str), Some("1"));
        assert_eq!(last.get("limit").map(String::as_str), Some("12"));

        assert_eq!(
            ctx.settings
                .remembered_filters("products")
                .get("category")
                .map(String::as_str),
            Some("electronics")
        );
        assert_eq!(catalog.snapshot().items.len(), 2);
    }
}
