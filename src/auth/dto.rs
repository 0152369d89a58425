use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::controllers::Resource;

/// Account role. Unknown values from the backend are treated as plain users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        match r {
            Role::User => "user".into(),
            Role::Admin => "admin".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        })
    }
}

/// The authenticated account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub frozen_until: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_frozen_at(&self, now: OffsetDateTime) -> bool {
        self.frozen_until.map(|until| until > now).unwrap_or(false)
    }
}

impl Resource for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(if self.blocked { "blocked" } else { "active" })
    }
}

/// Compact account shape embedded in listings, orders, blogs and reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A user reference the backend may or may not have populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Populated(u) => &u.id,
            UserRef::Id(id) => id,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            UserRef::Populated(u) => {
                let name = format!("{} {}", u.first_name, u.last_name).trim().to_string();
                if name.is_empty() {
                    u.email.clone().unwrap_or_else(|| u.id.clone())
                } else {
                    name
                }
            }
            UserRef::Id(id) => id.clone(),
        }
    }
}

/// Request body for login.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(regex(path = "crate::auth::validation::EMAIL_RE", message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub const FIELDS: &'static [&'static str] = &["email", "password"];

    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        }
    }
}

/// Request body for registration.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(regex(path = "crate::auth::validation::EMAIL_RE", message = "Enter a valid email address"))]
    pub email: String,
    #[validate(regex(path = "crate::auth::validation::PHONE_RE", message = "Enter a valid phone number"))]
    pub phone: String,
    pub gender: Gender,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl RegisterRequest {
    pub const FIELDS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "email",
        "phone",
        "gender",
        "address",
        "password",
    ];

    /// Trims text fields and lowercases the email.
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone = self.phone.trim().to_string();
        self.address = self.address.trim().to_string();
        self
    }
}

/// Response returned after login or register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// `/api/users/me` answers either `{ "user": {...} }` or the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl MeResponse {
    pub(crate) fn into_user(self) -> User {
        match self {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        }
    }
}

/// Body for `PATCH /api/users/me`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validation::check;
    use crate::error::ClientError;

    #[test]
    fn user_deserializes_from_backend_shape() {
        let json = r#"{
            "_id": "u1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@test.com",
            "role": "admin",
            "blocked": false,
            "frozenUntil": null,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let user: User = serde_json::from_str(json).expect("user");
        assert_eq!(user.id, "u1");
        assert_eq!(user.full_name(), "Ada Lovelace");
        assert!(user.is_admin());
        assert!(user.created_at.is_some());
    }

    #[test]
    fn unknown_role_is_plain_user() {
        let json = r#"{"id":"u2","email":"x@test.com","role":"seller"}"#;
        let user: User = serde_json::from_str(json).expect("user");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn login_request_normalizes_email() {
        let req = LoginRequest::new("  User@Test.COM ", "secret12");
        assert_eq!(req.email, "user@test.com");
        assert!(check(&req, LoginRequest::FIELDS).is_ok());
    }

    #[test]
    fn login_request_reports_email_first() {
        let req = LoginRequest::new("nope", "");
        match check(&req, LoginRequest::FIELDS) {
            Err(ClientError::Validation(fields)) => {
                assert_eq!(fields.first().map(|(f, _)| f), Some("email"));
                assert_eq!(fields.get("password"), Some("Password is required"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn register_requires_six_char_password() {
        let req = RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@test.com".into(),
            phone: "+44 20 7946 0958".into(),
            gender: Gender::Female,
            address: "12 Analytical Row".into(),
            password: "12345".into(),
        }
        .normalized();
        match check(&req, RegisterRequest::FIELDS) {
            Err(ClientError::Validation(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(
                    fields.get("password"),
                    Some("Password must be at least 6 characters")
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn register_serializes_camel_case() {
        let req = RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@test.com".into(),
            phone: "0712345678".into(),
            gender: Gender::Other,
            address: "Somewhere".into(),
            password: "secret12".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["gender"], "other");
    }

    #[test]
    fn user_ref_accepts_populated_or_bare_id() {
        let populated: UserRef =
            serde_json::from_str(r#"{"_id":"s1","firstName":"Sam","lastName":"Seller"}"#).unwrap();
        assert_eq!(populated.id(), "s1");
        assert_eq!(populated.display_name(), "Sam Seller");

        let bare: UserRef = serde_json::from_str(r#""s2""#).unwrap();
        assert_eq!(bare.id(), "s2");
    }

    #[test]
    fn gender_parse_is_case_insensitive() {
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("robot"), None);
    }
}
