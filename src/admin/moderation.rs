use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use crate::auth::User;
use crate::blogs::Blog;
use crate::complaints::Complaint;
use crate::controllers::{Action, MutationSource};
use crate::error::{ClientError, FieldErrors};
use crate::http::{unwrap_field, ApiClient};
use crate::products::Product;

/// Approve or reject a pending listing or blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject { reason: Option<String> },
}

impl Action for Verdict {
    fn name(&self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject { .. } => "reject",
        }
    }

    fn success_message(&self) -> String {
        match self {
            Verdict::Approve => "Approved".into(),
            Verdict::Reject { .. } => "Rejected".into(),
        }
    }
}

impl Verdict {
    fn body(&self) -> Value {
        match self {
            Verdict::Reject {
                reason: Some(reason),
            } if !reason.trim().is_empty() => json!({ "reason": reason.trim() }),
            _ => json!({}),
        }
    }
}

pub struct ListingModeration {
    api: ApiClient,
}

impl ListingModeration {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MutationSource for ListingModeration {
    type Item = Product;
    type Action = Verdict;

    #[instrument(skip(self))]
    async fn perform(&self, id: &str, action: &Verdict) -> Result<Product, ClientError> {
        let path = format!("/api/admin/listings/{}/{}", id, action.name());
        let value: Value = self.api.patch(&path, &action.body()).await?;
        unwrap_field(value, "product")
    }
}

pub struct BlogModeration {
    api: ApiClient,
}

impl BlogModeration {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MutationSource for BlogModeration {
    type Item = Blog;
    type Action = Verdict;

    #[instrument(skip(self))]
    async fn perform(&self, id: &str, action: &Verdict) -> Result<Blog, ClientError> {
        let path = format!("/api/admin/blogs/{}/{}", id, action.name());
        let value: Value = self.api.patch(&path, &action.body()).await?;
        unwrap_field(value, "blog")
    }
}

/// Account actions. Concurrent edits by two admins are last-write-wins
/// on the server; the user record carries no version to detect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Block,
    Unblock,
    Freeze { days: u32 },
    Unfreeze,
    Promote,
}

impl Action for UserAction {
    fn name(&self) -> &'static str {
        match self {
            UserAction::Block => "block",
            UserAction::Unblock => "unblock",
            UserAction::Freeze { .. } => "freeze",
            UserAction::Unfreeze => "unfreeze",
            UserAction::Promote => "promote",
        }
    }

    fn success_message(&self) -> String {
        match self {
            UserAction::Block => "User blocked".into(),
            UserAction::Unblock => "User unblocked".into(),
            UserAction::Freeze { days } => format!("User frozen for {} days", days),
            UserAction::Unfreeze => "User unfrozen".into(),
            UserAction::Promote => "User promoted to admin".into(),
        }
    }
}

pub struct UserModeration {
    api: ApiClient,
}

impl UserModeration {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MutationSource for UserModeration {
    type Item = User;
    type Action = UserAction;

    #[instrument(skip(self))]
    async fn perform(&self, id: &str, action: &UserAction) -> Result<User, ClientError> {
        let body = match action {
            UserAction::Freeze { days: 0 } => {
                return Err(ClientError::Validation(FieldErrors::single(
                    "days",
                    "Freeze for at least one day",
                )))
            }
            UserAction::Freeze { days } => json!({ "days": days }),
            _ => json!({}),
        };
        let path = format!("/api/admin/users/{}/{}", id, action.name());
        let value: Value = self.api.patch(&path, &body).await?;
        unwrap_field(value, "user")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintAction {
    Reply { message: String },
}

impl Action for ComplaintAction {
    fn name(&self) -> &'static str {
        match self {
            ComplaintAction::Reply { .. } => "reply",
        }
    }

    fn success_message(&self) -> String {
        "Reply sent".into()
    }
}

pub struct ComplaintDesk {
    api: ApiClient,
}

impl ComplaintDesk {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MutationSource for ComplaintDesk {
    type Item = Complaint;
    type Action = ComplaintAction;

    #[instrument(skip(self, action))]
    async fn perform(&self, id: &str, action: &ComplaintAction) -> Result<Complaint, ClientError> {
        let ComplaintAction::Reply { message } = action;
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::Validation(FieldErrors::single(
                "message",
                "Reply cannot be empty",
            )));
        }
        let path = format!("/api/admin/complaints/{}/reply", id);
        let value: Value = self.api.post(&path, &json!({ "message": message })).await?;
        unwrap_field(value, "complaint")
    }
}
