use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use validator::Validate;

use super::{
    collect_image_urls, normalize_attributes, parse_tags, AttributeRow, ImageInput, RepeatableRows,
    SubmitMode, SubmitOutcome,
};
use crate::error::{ClientError, FieldErrors};
use crate::notify::Notifier;
use crate::products::{Image, ListingPayload, ListingStatus, Product};
use crate::routes::{DashboardPage, Route};
use crate::uploads::UploadClient;

/// Where listing saves go; [`crate::products::ProductsApi`] in production.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn create_listing(&self, payload: &ListingPayload) -> Result<Product, ClientError>;
    async fn update_listing(&self, id: &str, payload: &ListingPayload) -> Result<Product, ClientError>;
}

/// Raw listing form input, exactly as typed.
#[derive(Debug, Clone, Default, Validate)]
pub struct ListingDraft {
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Title is required"))]
    pub title: String,
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Category is required"))]
    pub category: String,
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Condition is required"))]
    pub condition: String,
    pub price: String,
    pub quantity: String,
    pub negotiable: bool,
    pub location: String,
    #[validate(regex(
        path = "crate::auth::validation::NOT_BLANK_RE",
        message = "Description is required"
    ))]
    pub description: String,
    pub tags: String,
    pub attributes: RepeatableRows<AttributeRow>,
    pub images: RepeatableRows<ImageInput>,
}

impl ListingDraft {
    pub const FIELDS: &'static [&'static str] =
        &["title", "category", "condition", "price", "quantity", "description"];

    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            category: product.category.clone(),
            condition: product.condition.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.to_string(),
            negotiable: product.negotiable,
            location: product.location.clone(),
            description: product.description.clone(),
            tags: product.tags.join(", "),
            attributes: RepeatableRows::from_rows(
                product
                    .attributes
                    .iter()
                    .map(|a| AttributeRow::new(&a.key, &a.value))
                    .collect(),
            ),
            images: RepeatableRows::from_rows(
                product
                    .images
                    .iter()
                    .map(|i| ImageInput::Url(i.url.clone()))
                    .collect(),
            ),
        }
    }

    /// Field checks plus numeric parsing. Only parsed numbers leave here,
    /// so a payload can never carry a NaN price.
    pub fn check(&self) -> Result<(f64, u32), FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from_validation(&e, Self::FIELDS),
        };
        let price = parse_price(&self.price).map_err(|m| errors.push("price", m)).ok();
        let quantity = parse_quantity(&self.quantity)
            .map_err(|m| errors.push("quantity", m))
            .ok();
        match (price, quantity) {
            (Some(price), Some(quantity)) if errors.is_empty() => Ok((price, quantity)),
            _ => Err(errors.ordered(Self::FIELDS)),
        }
    }

    fn build_payload(
        &self,
        price: f64,
        quantity: u32,
        images: Vec<String>,
        status: ListingStatus,
    ) -> ListingPayload {
        ListingPayload {
            title: self.title.trim().to_string(),
            category: self.category.trim().to_string(),
            condition: self.condition.trim().to_string(),
            price,
            quantity,
            negotiable: self.negotiable,
            location: self.location.trim().to_string(),
            description: self.description.trim().to_string(),
            tags: parse_tags(&self.tags),
            attributes: normalize_attributes(self.attributes.rows()),
            images: images.into_iter().map(|url| Image { url }).collect(),
            status,
        }
    }
}

fn parse_price(raw: &str) -> Result<f64, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Price is required");
    }
    let price: f64 = raw.parse().map_err(|_| "Price must be a number")?;
    if !price.is_finite() {
        return Err("Price must be a number");
    }
    if price < 0.0 {
        return Err("Price cannot be negative");
    }
    Ok(price)
}

fn parse_quantity(raw: &str) -> Result<u32, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Quantity is required");
    }
    let quantity: u32 = raw.parse().map_err(|_| "Quantity must be a whole number")?;
    if quantity == 0 {
        return Err("Quantity must be at least 1");
    }
    Ok(quantity)
}

/// Create/edit listing page.
pub struct ListingForm {
    store: Arc<dyn ListingStore>,
    uploads: Arc<dyn UploadClient>,
    notifier: Notifier,
    editing: Option<String>,
    errors: FieldErrors,
    pub draft: ListingDraft,
}

impl ListingForm {
    pub fn new(store: Arc<dyn ListingStore>, uploads: Arc<dyn UploadClient>, notifier: Notifier) -> Self {
        Self {
            store,
            uploads,
            notifier,
            editing: None,
            errors: FieldErrors::new(),
            draft: ListingDraft::default(),
        }
    }

    pub fn edit(
        store: Arc<dyn ListingStore>,
        uploads: Arc<dyn UploadClient>,
        notifier: Notifier,
        product: &Product,
    ) -> Self {
        Self {
            editing: Some(product.id.clone()),
            draft: ListingDraft::from_product(product),
            ..Self::new(store, uploads, notifier)
        }
    }

    /// Id of the listing being edited; set after the first draft save.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Inline field errors from the last submit.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Validates, uploads pending images, then creates or updates.
    ///
    /// Validation failures are inline only (no notification); upload and
    /// server failures notify and leave the draft intact.
    #[instrument(skip(self), fields(editing = ?self.editing))]
    pub async fn submit(&mut self, mode: SubmitMode) -> Result<SubmitOutcome<Product>, ClientError> {
        let (price, quantity) = match self.draft.check() {
            Ok(numbers) => numbers,
            Err(errors) => {
                debug!(%errors, "listing draft rejected");
                self.errors = errors.clone();
                return Err(ClientError::Validation(errors));
            }
        };
        self.errors = FieldErrors::new();

        let images = match collect_image_urls(&mut self.draft.images, self.uploads.as_ref()).await {
            Ok(images) => images,
            Err(e) => {
                self.notifier.error("listing:upload", e.user_message());
                return Err(e);
            }
        };

        let status = match mode {
            SubmitMode::Draft => ListingStatus::Draft,
            SubmitMode::Pending => ListingStatus::Pending,
        };
        let payload = self.draft.build_payload(price, quantity, images, status);
        let saved = match &self.editing {
            Some(id) => self.store.update_listing(id, &payload).await,
            None => self.store.create_listing(&payload).await,
        };
        let product = match saved {
            Ok(product) => product,
            Err(e) => {
                self.notifier
                    .error(&format!("listing:save:{}", e.dedup_key()), e.user_message());
                return Err(e);
            }
        };
        info!(product_id = %product.id, status = status.as_str(), "listing saved");
        self.editing = Some(product.id.clone());

        match mode {
            SubmitMode::Draft => {
                self.notifier.success("listing:draft", "Draft saved");
                Ok(SubmitOutcome::Saved(product))
            }
            SubmitMode::Pending => Ok(SubmitOutcome::Navigate {
                to: Route::Dashboard(DashboardPage::Listings),
                flash: "Listing submitted for approval".into(),
                item: product,
            }),
        }
    }
}
