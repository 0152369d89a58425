//! Draft-state form controllers for listings, blogs and the profile.

pub mod blog;
pub mod listing;
pub mod profile;

use tracing::warn;

use crate::error::ClientError;
use crate::products::Attribute;
use crate::routes::Route;
use crate::uploads::{PendingUpload, UploadClient};

pub use blog::{BlogDraft, BlogForm, BlogStore};
pub use listing::{ListingDraft, ListingForm, ListingStore};
pub use profile::{ProfileDraft, ProfileForm};

/// Add/remove list of sub-rows that always keeps at least one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatableRows<R> {
    rows: Vec<R>,
}

impl<R: Default> Default for RepeatableRows<R> {
    fn default() -> Self {
        Self {
            rows: vec![R::default()],
        }
    }
}

impl<R: Default> RepeatableRows<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<R>) -> Self {
        if rows.is_empty() {
            Self::default()
        } else {
            Self { rows }
        }
    }

    pub fn add(&mut self) {
        self.rows.push(R::default());
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Removing the last remaining row is a no-op.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.rows.len() <= 1 || index >= self.rows.len() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    pub fn update<F: FnOnce(&mut R)>(&mut self, index: usize, edit: F) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                edit(row);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRow {
    pub key: String,
    pub value: String,
}

impl AttributeRow {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// An image row: either a URL typed in or a local file to upload.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Url(String),
    File(PendingUpload),
}

impl Default for ImageInput {
    fn default() -> Self {
        ImageInput::Url(String::new())
    }
}

/// Comma separated tags: trimmed, empties dropped, order kept.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rows with a blank key or value are never sent.
pub fn normalize_attributes(rows: &[AttributeRow]) -> Vec<Attribute> {
    rows.iter()
        .map(|r| (r.key.trim(), r.value.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| Attribute {
            key: k.to_string(),
            value: v.to_string(),
        })
        .collect()
}

/// Uploads pending files, replacing each with its returned URL, and
/// collects every non-blank URL in row order.
///
/// The first failed upload aborts the whole collection so the dependent
/// save never goes out with a missing image.
pub async fn collect_image_urls(
    rows: &mut RepeatableRows<ImageInput>,
    uploads: &dyn UploadClient,
) -> Result<Vec<String>, ClientError> {
    let mut urls = Vec::with_capacity(rows.len());
    for row in rows.rows.iter_mut() {
        let file = match row {
            ImageInput::Url(url) => {
                let url = url.trim();
                if !url.is_empty() {
                    urls.push(url.to_string());
                }
                continue;
            }
            ImageInput::File(file) => file.clone(),
        };
        let url = uploads.upload_image(&file).await.map_err(|e| {
            warn!(error = %e, "image upload failed; save blocked");
            match e {
                ClientError::Upload(_) => e,
                other => ClientError::Upload(other.user_message()),
            }
        })?;
        urls.push(url.clone());
        *row = ImageInput::Url(url);
    }
    Ok(urls)
}

/// Which status a form submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Stay on the form so the user can keep editing.
    Draft,
    /// Submit for approval and leave the form.
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    Saved(T),
    Navigate { to: Route, flash: String, item: T },
}

impl<T> SubmitOutcome<T> {
    pub fn item(&self) -> &T {
        match self {
            SubmitOutcome::Saved(item) | SubmitOutcome::Navigate { item, .. } => item,
        }
    }
}
