use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::validation::check;
use crate::auth::UserRef;
use crate::error::{ClientError, FieldErrors};
use crate::http::{unwrap_field, ApiClient};
use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct ReviewDraft {
    #[validate(range(min = 1, max = 5, message = "Choose a rating from 1 to 5"))]
    pub rating: u8,
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Comment is required"))]
    pub comment: String,
}

impl ReviewDraft {
    pub const FIELDS: &'static [&'static str] = &["rating", "comment"];
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewsResponse {
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    can_review: bool,
}

/// Reviews block on a product page. Only buyers of the product may post;
/// the backend keeps one review per user, so a resubmission replaces it.
pub struct ReviewPanel {
    api: ApiClient,
    notifier: Notifier,
    product_id: String,
    reviews: Vec<Review>,
    can_review: bool,
}

impl ReviewPanel {
    pub fn new(api: ApiClient, notifier: Notifier, product_id: &str) -> Self {
        Self {
            api,
            notifier,
            product_id: product_id.to_string(),
            reviews: Vec::new(),
            can_review: false,
        }
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn can_review(&self) -> bool {
        self.can_review
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(sum) / self.reviews.len() as f64)
    }

    #[instrument(skip(self), fields(product_id = %self.product_id))]
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let path = format!("/api/products/{}/reviews", self.product_id);
        match self.api.get::<ReviewsResponse>(&path).await {
            Ok(resp) => {
                self.reviews = resp.reviews;
                self.can_review = resp.can_review;
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .error(&format!("reviews:{}", e.dedup_key()), e.user_message());
                Err(e)
            }
        }
    }

    #[instrument(skip(self, draft), fields(product_id = %self.product_id, rating = draft.rating))]
    pub async fn submit(&mut self, draft: &ReviewDraft) -> Result<Review, ClientError> {
        if !self.can_review {
            return Err(ClientError::Validation(FieldErrors::single(
                "review",
                "Only buyers of this product can leave a review",
            )));
        }
        let draft = ReviewDraft {
            rating: draft.rating,
            comment: draft.comment.trim().to_string(),
        };
        check(&draft, ReviewDraft::FIELDS)?;

        let path = format!("/api/products/{}/reviews", self.product_id);
        let value: Value = match self.api.post(&path, &draft).await {
            Ok(value) => value,
            Err(e) => {
                self.notifier
                    .error(&format!("review:{}", e.dedup_key()), e.user_message());
                return Err(e);
            }
        };
        let review: Review = unwrap_field(value, "review")?;
        info!(review_id = %review.id, "review saved");
        self.merge(review.clone());
        Ok(review)
    }

    /// Replaces the same review (or the same author's) in place,
    /// otherwise prepends it.
    fn merge(&mut self, review: Review) {
        let author = review.user.as_ref().map(|u| u.id().to_string());
        let existing = self.reviews.iter().position(|r| {
            r.id == review.id
                || (author.is_some() && r.user.as_ref().map(|u| u.id().to_string()) == author)
        });
        match existing {
            Some(idx) => self.reviews[idx] = review,
            None => self.reviews.insert(0, review),
        }
    }
}
