use serde::{Deserialize, Serialize};

use crate::models::{FieldError, MessageBox};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the token issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fullname: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Private messages --

/// Raw form fields for a new private message. Missing text fields are
/// treated as empty so that validation can report them per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePrivateMessageRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub to_user: String,
    /// Send on behalf of another user. Administrators only.
    #[serde(default)]
    pub from_user: Option<i64>,
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub is_read: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePrivateMessageResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    #[serde(default)]
    pub r#box: MessageBox,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessageResponse {
    pub id: i64,
    pub subject: String,
    pub subject_html: String,
    pub message: String,
    pub from_user: i64,
    pub from_username: String,
    pub to_user: i64,
    pub to_username: String,
    pub creation_date: i64,
    pub creation_date_formatted: String,
    pub is_read: bool,
    pub link: String,
    pub link_html: String,
}

// -- Preferences --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetPreferenceRequest {
    pub value: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreferenceResponse {
    pub name: String,
    pub value: bool,
}
