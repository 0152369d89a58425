use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use validator::Validate;

use super::{collect_image_urls, parse_tags, ImageInput, RepeatableRows, SubmitMode, SubmitOutcome};
use crate::auth::validation::check;
use crate::blogs::{Blog, BlogPayload, BlogStatus};
use crate::error::{ClientError, FieldErrors};
use crate::notify::Notifier;
use crate::routes::{DashboardPage, Route};
use crate::uploads::UploadClient;

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_blog(&self, payload: &BlogPayload) -> Result<Blog, ClientError>;
    async fn update_blog(&self, id: &str, payload: &BlogPayload) -> Result<Blog, ClientError>;
}

#[derive(Debug, Clone, Default, Validate)]
pub struct BlogDraft {
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 20, message = "Write at least 20 characters"))]
    pub description: String,
    pub tags: String,
    pub images: RepeatableRows<ImageInput>,
}

impl BlogDraft {
    pub const FIELDS: &'static [&'static str] = &["title", "description"];

    pub fn from_blog(blog: &Blog) -> Self {
        Self {
            title: blog.title.clone(),
            description: blog.description.clone(),
            tags: blog.tags.join(", "),
            images: RepeatableRows::from_rows(blog.images.iter().cloned().map(ImageInput::Url).collect()),
        }
    }
}

pub struct BlogForm {
    store: Arc<dyn BlogStore>,
    uploads: Arc<dyn UploadClient>,
    notifier: Notifier,
    editing: Option<String>,
    errors: FieldErrors,
    pub draft: BlogDraft,
}

impl BlogForm {
    pub fn new(store: Arc<dyn BlogStore>, uploads: Arc<dyn UploadClient>, notifier: Notifier) -> Self {
        Self {
            store,
            uploads,
            notifier,
            editing: None,
            errors: FieldErrors::new(),
            draft: BlogDraft::default(),
        }
    }

    pub fn edit(
        store: Arc<dyn BlogStore>,
        uploads: Arc<dyn UploadClient>,
        notifier: Notifier,
        blog: &Blog,
    ) -> Self {
        Self {
            editing: Some(blog.id.clone()),
            draft: BlogDraft::from_blog(blog),
            ..Self::new(store, uploads, notifier)
        }
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub async fn submit(&mut self, mode: SubmitMode) -> Result<SubmitOutcome<Blog>, ClientError> {
        let mut trimmed = self.draft.clone();
        trimmed.description = trimmed.description.trim().to_string();
        if let Err(e) = check(&trimmed, BlogDraft::FIELDS) {
            if let ClientError::Validation(fields) = &e {
                self.errors = fields.clone();
            }
            return Err(e);
        }
        self.errors = FieldErrors::new();

        let images = match collect_image_urls(&mut self.draft.images, self.uploads.as_ref()).await {
            Ok(images) => images,
            Err(e) => {
                self.notifier.error("blog:upload", e.user_message());
                return Err(e);
            }
        };
        let payload = BlogPayload {
            title: self.draft.title.trim().to_string(),
            description: trimmed.description,
            tags: parse_tags(&self.draft.tags),
            images,
            status: match mode {
                SubmitMode::Draft => BlogStatus::Draft,
                SubmitMode::Pending => BlogStatus::Pending,
            },
        };

        let saved = match &self.editing {
            Some(id) => self.store.update_blog(id, &payload).await,
            None => self.store.create_blog(&payload).await,
        };
        let blog = match saved {
            Ok(blog) => blog,
            Err(e) => {
                self.notifier
                    .error(&format!("blog:save:{}", e.dedup_key()), e.user_message());
                return Err(e);
            }
        };
        info!(blog_id = %blog.id, status = payload.status.as_str(), "blog saved");
        self.editing = Some(blog.id.clone());

        Ok(match mode {
            SubmitMode::Draft => {
                self.notifier.success("blog:draft", "Draft saved");
                SubmitOutcome::Saved(blog)
            }
            SubmitMode::Pending => SubmitOutcome::Navigate {
                to: Route::Dashboard(DashboardPage::Blogs),
                flash: "Blog submitted for review".into(),
                item: blog,
            },
        })
    }
}
