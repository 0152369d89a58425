use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::auth::User;
use crate::blogs::Blog;
use crate::complaints::Complaint;
use crate::controllers::{ListController, RestListSource};
use crate::error::{ClientError, FieldErrors};
use crate::http::{unwrap_field, ApiClient};
use crate::products::Product;
use crate::state::AppContext;

#[derive(Clone)]
pub struct AdminApi {
    api: ApiClient,
}

impl AdminApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn listings(&self) -> RestListSource<Product> {
        RestListSource::new(self.api.clone(), "/api/admin/listings", "products")
    }

    pub fn users(&self) -> RestListSource<User> {
        RestListSource::new(self.api.clone(), "/api/admin/users", "users")
    }

    pub fn blogs(&self) -> RestListSource<Blog> {
        RestListSource::new(self.api.clone(), "/api/admin/blogs", "blogs")
    }

    pub fn complaints(&self) -> RestListSource<Complaint> {
        RestListSource::new(self.api.clone(), "/api/admin/complaints", "complaints")
    }

    /// Listings whose seller account no longer exists.
    pub async fn orphan_listings(&self) -> Result<Vec<Product>, ClientError> {
        let value: Value = self.api.get("/api/admin/listings/orphans").await?;
        let products: Vec<Product> = unwrap_field(value, "products")?;
        Ok(products.into_iter().filter(Product::is_orphan).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_listing(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete(&format!("/api/admin/listings/{}", id)).await?;
        info!(product_id = id, "listing removed by admin");
        Ok(())
    }

    /// Current platform commission in percent.
    pub async fn commission(&self) -> Result<f64, ClientError> {
        let value: Value = self.api.get("/api/admin/commission").await?;
        value
            .get("commission")
            .and_then(Value::as_f64)
            .ok_or_else(|| ClientError::Decode("commission missing from response".into()))
    }

    #[instrument(skip(self))]
    pub async fn set_commission(&self, percent: f64) -> Result<f64, ClientError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(ClientError::Validation(FieldErrors::single(
                "commission",
                "Commission must be between 0 and 100",
            )));
        }
        let value: Value = self
            .api
            .patch("/api/admin/commission", &json!({ "commission": percent }))
            .await?;
        let saved = value.get("commission").and_then(Value::as_f64).unwrap_or(percent);
        info!(commission = saved, "commission updated");
        Ok(saved)
    }
}

/// Moderation queue; starts on pending listings and remembers the tab.
pub fn listing_queue(ctx: &AppContext) -> ListController<RestListSource<Product>> {
    ListController::new(
        "admin.listings",
        AdminApi::new(ctx.api.clone()).listings(),
        ctx.notifier.clone(),
        ctx.remembered_list_options().with_filter("status", "pending"),
    )
}

pub fn user_table(ctx: &AppContext) -> ListController<RestListSource<User>> {
    ListController::new(
        "admin.users",
        AdminApi::new(ctx.api.clone()).users(),
        ctx.notifier.clone(),
        ctx.remembered_list_options(),
    )
}

pub fn blog_queue(ctx: &AppContext) -> ListController<RestListSource<Blog>> {
    ListController::new(
        "admin.blogs",
        AdminApi::new(ctx.api.clone()).blogs(),
        ctx.notifier.clone(),
        ctx.remembered_list_options().with_filter("status", "pending"),
    )
}

pub fn complaint_inbox(ctx: &AppContext) -> ListController<RestListSource<Complaint>> {
    ListController::new(
        "admin.complaints",
        AdminApi::new(ctx.api.clone()).complaints(),
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
        routing::{get, patch, post},
        Json, Router,
    };

    use super::*;
    use crate::admin::moderation::{
        ComplaintAction, ComplaintDesk, ListingModeration, UserAction, UserModeration, Verdict,
    };
    use crate::controllers::MutationController;
    use crate::testkit;

    #[derive(Clone, Default)]
    struct Db {
        listings: Arc<Mutex<HashMap<String, String>>>,
        commission: Arc<Mutex<f64>>,
    }

    fn listing(id: &str, status: &str) -> Value {
        json!({ "_id": id, "title": id, "status": status, "seller": "s1" })
    }

    async fn list_listings(
        State(db): State<Db>,
        Query(q): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let listings = db.listings.lock().unwrap();
        let mut rows: Vec<Value> = listings
            .iter()
            .filter(|(_, s)| q.get("status").map_or(true, |w| w == *s))
            .map(|(id, s)| listing(id, s))
            .collect();
        rows.sort_by(|a, b| a["_id"].as_str().cmp(&b["_id"].as_str()));
        let total = rows.len();
        Json(json!({ "products": rows, "total": total }))
    }

    async fn moderate(
        State(db): State<Db>,
        Path((id, action)): Path<(String, String)>,
    ) -> impl IntoResponse {
        let mut listings = db.listings.lock().unwrap();
        let Some(status) = listings.get_mut(&id) else {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "Listing not found" })));
        };
        let target = if action == "approve" { "approved" } else { "rejected" };
        if status == target {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Listing is already {}", target) })),
            );
        }
        *status = target.to_string();
        (StatusCode::OK, Json(json!({ "product": listing(&id, target) })))
    }

    async fn user_action(
        Path((id, action)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        let days = body["days"].as_u64().unwrap_or(0);
        let mut user = json!({ "_id": id, "email": "u@test.com", "role": "user", "blocked": false });
        match action.as_str() {
            "block" => user["blocked"] = json!(true),
            "freeze" => user["frozenUntil"] = json!(format!("2030-01-{:02}T00:00:00Z", days)),
            "promote" => user["role"] = json!("admin"),
            _ => {}
        }
        Json(json!({ "user": user }))
    }

    async fn reply(Path(id): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
        Json(json!({ "complaint": {
            "_id": id, "subject": "Late", "status": "resolved",
            "adminReply": { "message": body["message"] }
        }}))
    }

    async fn orphans() -> impl IntoResponse {
        Json(json!({ "products": [
            { "_id": "o1", "title": "Lost", "seller": null },
            { "_id": "o2", "title": "Found", "seller": "s1" }
        ]}))
    }

    async fn get_commission(State(db): State<Db>) -> impl IntoResponse {
        Json(json!({ "commission": *db.commission.lock().unwrap() }))
    }

    async fn put_commission(State(db): State<Db>, Json(body): Json<Value>) -> impl IntoResponse {
        let pct = body["commission"].as_f64().unwrap_or_default();
        *db.commission.lock().unwrap() = pct;
        Json(json!({ "commission": pct }))
    }

    async fn backend() -> (String, Db) {
        let db = Db::default();
        {
            let mut l = db.listings.lock().unwrap();
            l.insert("p1".into(), "pending".into());
            l.insert("p2".into(), "pending".into());
            l.insert("p3".into(), "approved".into());
        }
        *db.commission.lock().unwrap() = 5.0;
        let router = Router::new()
            .route("/api/admin/listings", get(list_listings))
            .route("/api/admin/listings/orphans", get(orphans))
            .route("/api/admin/listings/:id/:action", patch(moderate))
            .route("/api/admin/users/:id/:action", patch(user_action))
            .route("/api/admin/complaints/:id/reply", post(reply))
            .route("/api/admin/commission", get(get_commission).patch(put_commission))
            .with_state(db.clone());
        (testkit::spawn_backend(router).await, db)
    }

    #[tokio::test]
    async fn approving_from_pending_queue_patches_without_reload() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let queue = listing_queue(&ctx);
        queue.mount();
        queue.settled().await;
        assert_eq!(queue.snapshot().items.len(), 2);

        let moderation = MutationController::new(ListingModeration::new(ctx.api.clone()), ctx.notifier.clone());
        let product = moderation.run(&queue, "p1", Verdict::Approve).await.expect("approve");
        assert_eq!(product.status.as_str(), "approved");

        let snap = queue.snapshot();
        let ids: Vec<&str> = snap.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2"]);
        assert_eq!(snap.total, 1);
    }

    #[tokio::test]
    async fn rejected_transition_keeps_list_and_shows_server_text() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let queue = ListController::new(
            "admin.listings.all",
            AdminApi::new(ctx.api.clone()).listings(),
            ctx.notifier.clone(),
            ctx.list_options(),
        );
        queue.mount();
        queue.settled().await;
        let before = queue.snapshot().items;

        let moderation = MutationController::new(ListingModeration::new(ctx.api.clone()), ctx.notifier.clone());
        let err = moderation.run(&queue, "p3", Verdict::Approve).await.unwrap_err();
        assert_eq!(err.user_message(), "Listing is already approved");
        assert_eq!(queue.snapshot().items, before);
        assert_eq!(ctx.notifier.errors()[0].message, "Listing is already approved");
    }

    #[tokio::test]
    async fn user_actions_return_updated_user() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let users = MutationController::new(UserModeration::new(ctx.api.clone()), ctx.notifier.clone());

        let blocked = users.perform("u1", UserAction::Block).await.expect("block");
        assert!(blocked.blocked);

        let frozen = users.perform("u1", UserAction::Freeze { days: 7 }).await.expect("freeze");
        assert!(frozen.frozen_until.is_some());

        let promoted = users.perform("u1", UserAction::Promote).await.expect("promote");
        assert!(promoted.is_admin());

        let err = users.perform("u1", UserAction::Freeze { days: 0 }).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn complaint_reply_is_attached() {
        let (base, _) = backend().await;
        let ctx = testkit::context(&base);
        let desk = MutationController::new(ComplaintDesk::new(ctx.api.clone()), ctx.notifier.clone());
        let complaint = desk
            .perform(
                "c1",
                ComplaintAction::Reply {
                    message: " Refund issued ".into(),
                },
            )
            .await
            .expect("reply");
        assert_eq!(
            complaint.admin_reply.map(|r| r.message),
            Some("Refund issued".to_string())
        );
        assert_eq!(ctx.notifier.active()[0].message, "Reply sent");
    }

    #[tokio::test]
    async fn orphans_and_commission() {
        let (base, db) = backend().await;
        let ctx = testkit::context(&base);
        let admin = AdminApi::new(ctx.api.clone());

        let orphans = admin.orphan_listings().await.expect("orphans");
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "o1");

        assert_eq!(admin.commission().await.expect("commission"), 5.0);
        assert_eq!(admin.set_commission(7.5).await.expect("set"), 7.5);
        assert_eq!(*db.commission.lock().unwrap(), 7.5);
        assert!(admin.set_commission(120.0).await.is_err());
        assert_eq!(*db.commission.lock().unwrap(), 7.5);
    }
}
