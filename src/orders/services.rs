use serde_json::Value;
use tracing::{info, instrument};

use super::dto::{Delivery, Order, OrderRequest};
use crate::auth::validation::check;
use crate::controllers::{ListController, RestListSource};
use crate::error::{ClientError, FieldErrors};
use crate::http::{unwrap_field, ApiClient};
use crate::state::AppContext;

#[derive(Clone)]
pub struct OrdersApi {
    api: ApiClient,
}

impl OrdersApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Checks the delivery block and quantity locally before posting.
    #[instrument(skip(self, delivery))]
    pub async fn place(
        &self,
        product_id: &str,
        quantity: u32,
        delivery: &Delivery,
    ) -> Result<Order, ClientError> {
        let delivery = delivery.normalized();
        if quantity == 0 {
            return Err(ClientError::Validation(FieldErrors::single(
                "quantity",
                "Quantity must be at least 1",
            )));
        }
        check(&delivery, Delivery::FIELDS)?;

        let request = OrderRequest {
            product_id: product_id.to_string(),
            quantity,
            delivery,
        };
        let value: Value = self.api.post("/api/orders", &request).await?;
        let order: Order = unwrap_field(value, "order")?;
        info!(order_id = %order.id, total = order.total_amount, "order placed");
        Ok(order)
    }

    /// Purchases made by the signed-in user.
    pub fn history(&self) -> RestListSource<Order> {
        RestListSource::new(self.api.clone(), "/api/orders/history", "orders")
    }

    /// Orders received as a seller.
    pub fn sales(&self) -> RestListSource<Order> {
        RestListSource::new(self.api.clone(), "/api/orders/sales", "orders")
    }
}

pub fn order_history(ctx: &AppContext) -> ListController<RestListSource<Order>> {
    ListController::new(
        "dashboard.orders",
        OrdersApi::new(ctx.api.clone()).history(),
        ctx.notifier.clone(),
        ctx.remembered_list_options(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use serde_json::json;

    use super::*;
    use crate::testkit;

    #[derive(Clone, Default)]
    struct Hits(Arc<AtomicUsize>);

    async fn create(State(hits): State<Hits>, Json(body): Json<Value>) -> impl IntoResponse {
        hits.0.fetch_add(1, Ordering::SeqCst);
        if body["productId"] == "own" {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "You cannot buy your own listing" })),
            );
        }
        (
            StatusCode::CREATED,
            Json(json!({ "order": {
                "_id": "o1", "product": body["productId"], "quantity": body["quantity"],
                "price": 80, "commissionAmount": 4, "totalAmount": 80, "delivery": body["delivery"]
            }})),
        )
    }

    fn delivery() -> Delivery {
        Delivery {
            name: " Ana Buyer ".into(),
            email: "Ana@Test.com".into(),
            phone: "0712345678".into(),
            address: "1 Market Road".into(),
        }
    }

    async fn api() -> (OrdersApi, Hits) {
        let hits = Hits::default();
        let router = Router::new()
            .route("/api/orders", post(create))
            .with_state(hits.clone());
        let ctx = testkit::context(&testkit::spawn_backend(router).await);
        (OrdersApi::new(ctx.api.clone()), hits)
    }

    #[tokio::test]
    async fn places_order_with_normalized_delivery() {
        let (orders, _) = api().await;
        let order = orders.place("p1", 1, &delivery()).await.expect("order");
        assert_eq!(order.id, "o1");
        let sent = order.delivery.unwrap();
        assert_eq!(sent.name, "Ana Buyer");
        assert_eq!(sent.email, "ana@test.com");
    }

    #[tokio::test]
    async fn invalid_delivery_never_reaches_backend() {
        let (orders, hits) = api().await;
        let mut bad = delivery();
        bad.email = "not-an-email".into();
        let err = orders.place("p1", 1, &bad).await.unwrap_err();
        match err {
            ClientError::Validation(fields) => {
                assert_eq!(fields.get("email"), Some("Enter a valid email address"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(orders.place("p1", 0, &delivery()).await.is_err());
        assert_eq!(hits.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn business_rule_message_passes_through() {
        let (orders, hits) = api().await;
        let err = orders.place("own", 1, &delivery()).await.unwrap_err();
        assert_eq!(err.user_message(), "You cannot buy your own listing");
        assert_eq!(hits.0.load(Ordering::SeqCst), 1);
    }
}
