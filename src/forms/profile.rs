use std::sync::Arc;

use tracing::instrument;
use validator::{Validate, ValidationError};

use crate::auth::validation::{check, is_valid_phone};
use crate::auth::{Gender, ProfileUpdate, SessionStore, User};
use crate::error::{ClientError, FieldErrors};
use crate::notify::Notifier;
use crate::uploads::{PendingUpload, UploadClient};

fn optional_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() || is_valid_phone(phone.trim()) {
        return Ok(());
    }
    let mut err = ValidationError::new("phone");
    err.message = Some("Enter a valid phone number".into());
    Err(err)
}

#[derive(Debug, Clone, Default, Validate)]
pub struct ProfileDraft {
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "First name is required"))]
    pub first_name: String,
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom = "optional_phone")]
    pub phone: String,
    pub address: String,
    pub gender: Option<Gender>,
    pub avatar_url: Option<String>,
    /// New avatar chosen but not uploaded yet.
    pub avatar: Option<PendingUpload>,
}

impl ProfileDraft {
    pub const FIELDS: &'static [&'static str] = &["first_name", "last_name", "phone"];

    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
            gender: user.gender.as_deref().and_then(Gender::parse),
            avatar_url: user.avatar_url.clone(),
            avatar: None,
        }
    }

    /// Blank optional fields are omitted, unless `previous` had a value:
    /// then an empty string is sent so the server clears it.
    fn to_update(&self, previous: Option<&User>, avatar_url: Option<String>) -> ProfileUpdate {
        let text = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        let clearable = |s: &str, before: Option<&String>| {
            text(s).or_else(|| {
                before
                    .filter(|b| !b.trim().is_empty())
                    .map(|_| String::new())
            })
        };
        ProfileUpdate {
            first_name: text(&self.first_name),
            last_name: text(&self.last_name),
            phone: clearable(&self.phone, previous.and_then(|u| u.phone.as_ref())),
            address: clearable(&self.address, previous.and_then(|u| u.address.as_ref())),
            gender: self.gender,
            avatar_url,
        }
    }
}

/// Profile page. Saves go through [`SessionStore::update_profile`] so the
/// cached user changes with the server copy.
pub struct ProfileForm {
    sessions: SessionStore,
    uploads: Arc<dyn UploadClient>,
    notifier: Notifier,
    errors: FieldErrors,
    pub draft: ProfileDraft,
}

impl ProfileForm {
    pub fn new(sessions: SessionStore, uploads: Arc<dyn UploadClient>, notifier: Notifier) -> Self {
        let draft = sessions
            .view()
            .current_user()
            .map(|u| ProfileDraft::from_user(&u))
            .unwrap_or_default();
        Self {
            sessions,
            uploads,
            notifier,
            errors: FieldErrors::new(),
            draft,
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<User, ClientError> {
        if let Err(e) = check(&self.draft, ProfileDraft::FIELDS) {
            if let ClientError::Validation(fields) = &e {
                self.errors = fields.clone();
            }
            return Err(e);
        }
        self.errors = FieldErrors::new();

        let avatar_url = match &self.draft.avatar {
            Some(file) => match self.uploads.upload_image(file).await {
                Ok(url) => Some(url),
                Err(e) => {
                    self.notifier.error("profile:avatar", e.user_message());
                    return Err(e);
                }
            },
            None => None,
        };

        let previous = self.sessions.view().current_user();
        let update = self.draft.to_update(previous.as_ref(), avatar_url.clone());
        match self.sessions.update_profile(&update).await {
            Ok(user) => {
                if avatar_url.is_some() {
                    self.draft.avatar = None;
                }
                self.draft.avatar_url = user.avatar_url.clone();
                self.notifier.success("profile:saved", "Profile updated");
                Ok(user)
            }
            Err(e) => {
                self.notifier
                    .error(&format!("profile:{}", e.dedup_key()), e.user_message());
                Err(e)
            }
        }
    }
}
