use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::dto::{Blog, BlogPayload, Comment, FeedbackCounts};
use crate::controllers::{ListController, RestListSource};
use crate::error::{ClientError, FieldErrors};
use crate::forms::blog::BlogStore;
use crate::http::{unwrap_field, ApiClient};
use crate::notify::Notifier;
use crate::state::AppContext;

#[derive(Clone)]
pub struct BlogsApi {
    api: ApiClient,
}

impl BlogsApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get(&self, id: &str) -> Result<Blog, ClientError> {
        let value: Value = self.api.get(&format!("/api/blogs/{}", id)).await?;
        unwrap_field(value, "blog")
    }

    #[instrument(skip(self, payload), fields(status = payload.status.as_str()))]
    pub async fn create(&self, payload: &BlogPayload) -> Result<Blog, ClientError> {
        let value: Value = self.api.post("/api/blogs", payload).await?;
        unwrap_field(value, "blog")
    }

    #[instrument(skip(self, payload), fields(status = payload.status.as_str()))]
    pub async fn update(&self, id: &str, payload: &BlogPayload) -> Result<Blog, ClientError> {
        let value: Value = self.api.patch(&format!("/api/blogs/{}", id), payload).await?;
        unwrap_field(value, "blog")
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete(&format!("/api/blogs/{}", id)).await?;
        Ok(())
    }

    pub async fn comments(&self, id: &str) -> Result<Vec<Comment>, ClientError> {
        let value: Value = self.api.get(&format!("/api/blogs/{}/comments", id)).await?;
        unwrap_field(value, "comments")
    }

    pub async fn add_comment(&self, id: &str, text: &str) -> Result<Comment, ClientError> {
        let value: Value = self
            .api
            .post(&format!("/api/blogs/{}/comments", id), &json!({ "text": text }))
            .await?;
        unwrap_field(value, "comment")
    }

    pub async fn feedback(&self, id: &str, helpful: bool) -> Result<FeedbackCounts, ClientError> {
        self.api
            .post(&format!("/api/blogs/{}/feedback", id), &json!({ "helpful": helpful }))
            .await
    }

    pub fn published(&self) -> RestListSource<Blog> {
        RestListSource::new(self.api.clone(), "/api/blogs", "blogs")
    }

    pub fn mine(&self) -> RestListSource<Blog> {
        RestListSource::new(self.api.clone(), "/api/blogs/mine", "blogs")
    }
}

#[async_trait]
impl BlogStore for BlogsApi {
    async fn create_blog(&self, payload: &BlogPayload) -> Result<Blog, ClientError> {
        self.create(payload).await
    }

    async fn update_blog(&self, id: &str, payload: &BlogPayload) -> Result<Blog, ClientError> {
        self.update(id, payload).await
    }
}

pub fn blog_list(ctx: &AppContext) -> ListController<RestListSource<Blog>> {
    ListController::new(
        "blogs",
        BlogsApi::new(ctx.api.clone()).published(),
        ctx.notifier.clone(),
        ctx.list_options(),
    )
}

/// Blog detail page: the post, its comments and feedback buttons.
///
/// Writes merge the server's answer into local state instead of
/// reloading the thread.
pub struct BlogThread {
    api: BlogsApi,
    notifier: Notifier,
    blog: Option<Blog>,
    comments: Vec<Comment>,
}

impl BlogThread {
    pub fn new(api: BlogsApi, notifier: Notifier) -> Self {
        Self {
            api,
            notifier,
            blog: None,
            comments: Vec::new(),
        }
    }

    pub fn blog(&self) -> Option<&Blog> {
        self.blog.as_ref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Loads the post and its comments concurrently.
    #[instrument(skip(self))]
    pub async fn load(&mut self, id: &str) -> Result<(), ClientError> {
        let (blog, comments) = tokio::join!(self.api.get(id), self.api.comments(id));
        match blog.and_then(|b| comments.map(|c| (b, c))) {
            Ok((blog, comments)) => {
                self.blog = Some(blog);
                self.comments = comments;
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .error(&format!("blog:{}:{}", id, e.dedup_key()), e.user_message());
                Err(e)
            }
        }
    }

    pub async fn add_comment(&mut self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation(FieldErrors::single(
                "comment",
                "Comment cannot be empty",
            )));
        }
        let Some(blog) = self.blog.as_mut() else {
            return Err(ClientError::Decode("blog not loaded".into()));
        };
        match self.api.add_comment(&blog.id, text).await {
            Ok(comment) => {
                info!(blog_id = %blog.id, comment_id = %comment.id, "comment added");
                self.comments.push(comment);
                blog.comment_count += 1;
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .error(&format!("comment:{}", e.dedup_key()), e.user_message());
                Err(e)
            }
        }
    }

    /// Applies the server's tallies; counts are never guessed locally.
    pub async fn give_feedback(&mut self, helpful: bool) -> Result<FeedbackCounts, ClientError> {
        let Some(blog) = self.blog.as_mut() else {
            return Err(ClientError::Decode("blog not loaded".into()));
        };
        match self.api.feedback(&blog.id, helpful).await {
            Ok(counts) => {
                blog.helpful_count = counts.helpful_count;
                blog.not_helpful_count = counts.not_helpful_count;
                Ok(counts)
            }
            Err(e) => {
                self.notifier
                    .error(&format!("feedback:{}", e.dedup_key()), e.user_message());
                Err(e)
            }
        }
    }
}
