use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserRef;
use crate::controllers::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Sold => "sold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// Listing image. Older records store the bare URL string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ImageRepr")]
pub struct Image {
    pub url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageRepr {
    Object { url: String },
    Bare(String),
}

impl From<ImageRepr> for Image {
    fn from(r: ImageRepr) -> Self {
        match r {
            ImageRepr::Object { url } | ImageRepr::Bare(url) => Image { url },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub negotiable: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub status: ListingStatus,
    /// `None` when the seller account no longer exists.
    #[serde(default)]
    pub seller: Option<UserRef>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

fn one() -> u32 {
    1
}

impl Product {
    pub fn is_orphan(&self) -> bool {
        self.seller.is_none()
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

impl Resource for Product {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

/// Body for `POST /api/products` and `PATCH /api/products/:id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    pub title: String,
    pub category: String,
    pub condition: String,
    pub price: f64,
    pub quantity: u32,
    pub negotiable: bool,
    pub location: String,
    pub description: String,
    pub tags: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub images: Vec<Image>,
    pub status: ListingStatus,
}

/// Catalog filter keys understood by `GET /api/products`.
pub mod filters {
    pub const CATEGORY: &str = "category";
    pub const CONDITION: &str = "condition";
    pub const MIN_PRICE: &str = "minPrice";
    pub const MAX_PRICE: &str = "maxPrice";
    pub const STATUS: &str = "status";
}
