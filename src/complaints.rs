use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::validation::check;
use crate::auth::UserRef;
use crate::controllers::{ListController, Resource, RestListSource};
use crate::error::ClientError;
use crate::http::{unwrap_field, ApiClient};
use crate::state::AppContext;
use crate::uploads::{PendingUpload, UploadClient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReply {
    pub message: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub replied_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(alias = "_id")]
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "open")]
    pub status: String,
    #[serde(default)]
    pub admin_reply: Option<AdminReply>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

fn open() -> String {
    "open".into()
}

impl Complaint {
    pub fn is_answered(&self) -> bool {
        self.admin_reply.is_some()
    }
}

impl Resource for Complaint {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct ComplaintDraft {
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 10, message = "Describe the problem in at least 10 characters"))]
    pub message: String,
    pub product_id: Option<String>,
    /// Optional screenshot, uploaded before the complaint is filed.
    pub image: Option<PendingUpload>,
}

impl ComplaintDraft {
    pub const FIELDS: &'static [&'static str] = &["subject", "message"];
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComplaintBody<'a> {
    subject: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
}

#[derive(Clone)]
pub struct ComplaintsApi {
    api: ApiClient,
    uploads: Arc<dyn UploadClient>,
}

impl ComplaintsApi {
    pub fn new(api: ApiClient, uploads: Arc<dyn UploadClient>) -> Self {
        Self { api, uploads }
    }

    /// Files a complaint. A failed screenshot upload stops the submission.
    #[instrument(skip(self, draft), fields(subject = %draft.subject))]
    pub async fn create(&self, draft: &ComplaintDraft) -> Result<Complaint, ClientError> {
        let draft = ComplaintDraft {
            subject: draft.subject.trim().to_string(),
            message: draft.message.trim().to_string(),
            ..draft.clone()
        };
        check(&draft, ComplaintDraft::FIELDS)?;

        let image_url = match &draft.image {
            Some(file) => Some(self.uploads.upload_image(file).await?),
            None => None,
        };
        let body = ComplaintBody {
            subject: &draft.subject,
            message: &draft.message,
            product_id: draft.product_id.as_deref().filter(|p| !p.is_empty()),
            image_url,
        };
        let value: Value = self.api.post("/api/complaints", &body).await?;
        let complaint: Complaint = unwrap_field(value, "complaint")?;
        info!(complaint_id = %complaint.id, "complaint filed");
        Ok(complaint)
    }

    pub fn mine(&self) -> RestListSource<Complaint> {
        RestListSource::new(self.api.clone(), "/api/complaints/mine", "complaints")
    }
}

pub fn my_complaints(ctx: &AppContext) -> ListController<RestListSource<Complaint>> {
    let api = ComplaintsApi::new(ctx.api.clone(), ctx.uploads.clone());
    ListController::new(
        "dashboard.complaints",
        api.mine(),
        ctx.notifier.clone(),
        ctx.list_options(),
    )
}
