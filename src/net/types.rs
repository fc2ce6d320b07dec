//! Wire DTOs for the match backend's REST API.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's JSON so serde stays lossless. Timestamps
//! are kept as the backend's strings; the client only displays and compares
//! them, never does arithmetic on them.

use serde::{Deserialize, Serialize};

/// Served prefix for uploaded image files.
pub const UPLOAD_PREFIX: &str = "/uploads/";

/// Storage directory name the backend prepends to saved file paths.
const STORAGE_ROOT: &str = "uploads";

/// Authenticated user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Display name, if the account has one.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Role flag.
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Images uploaded by this user. Absent from profile-update responses.
    #[serde(default)]
    pub total_uploads: u64,
    /// Match results originating from this user's images.
    #[serde(default)]
    pub total_matches: u64,
}

impl User {
    /// Name to show in greetings: the full name when set, else the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Partial profile update; unset fields are left untouched by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.full_name.is_none() && self.password.is_none()
    }
}

/// An uploaded image, either a reference-corpus entry or a query submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub filename: String,
    /// Backend storage path (e.g. `uploads/query/<uuid>.jpg`).
    pub filepath: String,
    /// Owning user; the image endpoints do not always include it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub is_reference: bool,
    pub created_at: String,
}

impl Image {
    /// Path of the image under the backend's static upload mount.
    ///
    /// `uploads/reference/a.jpg` becomes `/uploads/reference/a.jpg`; a bare
    /// file name becomes `/uploads/a.jpg`.
    #[must_use]
    pub fn public_path(&self) -> String {
        let normalized = self.filepath.replace('\\', "/");
        let relative = normalized.trim_start_matches("./").trim_start_matches('/');
        let relative = relative
            .strip_prefix(STORAGE_ROOT)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(relative);
        format!("{UPLOAD_PREFIX}{relative}")
    }

    /// Human label for the image's corpus role.
    #[must_use]
    pub fn role_label(&self) -> &'static str {
        if self.is_reference { "Reference Image" } else { "Query Image" }
    }
}

/// Result of matching one query image against the reference corpus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: i64,
    /// The query image that was submitted.
    pub source_image_id: i64,
    pub matched_image_id: i64,
    /// Similarity in `[0, 1]`.
    pub similarity_score: f64,
    pub match_date: String,
    pub matched_image: Image,
}

/// The three successful shapes of a match response.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome {
    /// A reference face was close enough.
    Matched(MatchResult),
    /// Reference images exist but none matched.
    NoMatch,
    /// The reference corpus is empty; carries the backend's explanation.
    NoReferenceImages(String),
}

impl MatchOutcome {
    /// Interpret a 2xx match response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is neither `null`, a `detail` notice,
    /// nor a match result.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::NoMatch);
        }
        if value.get("id").is_none() {
            if let Some(detail) = value.get("detail").and_then(serde_json::Value::as_str) {
                return Ok(Self::NoReferenceImages(detail.to_owned()));
            }
        }
        serde_json::from_value(value).map(Self::Matched)
    }
}

/// Credential-exchange response from `POST /token`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Backend liveness report from `GET /health`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub status: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
