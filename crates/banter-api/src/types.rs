//! Wire types for the backend API
//!
//! Repository payloads arrive in two historical spellings (`full_name` vs
//! `fullName`; `html_url` and/or `url`). They are normalized into the
//! canonical [`Repository`] during deserialization, so nothing downstream
//! ever consults the raw variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Chat models the backend accepts.
pub const AVAILABLE_CHAT_MODELS: [&str; 5] = [
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
];

/// Image models the backend accepts.
pub const AVAILABLE_IMAGE_MODELS: [&str; 2] = ["dall-e-3", "dall-e-2"];

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// One user's record in the remote session store.
///
/// Every field except the id is optional; saves overwrite single fields
/// unconditionally and the store keeps no version counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    pub session_id: String,
    pub github_token: Option<String>,
    pub github_username: Option<String>,
    pub github_display_name: Option<String>,
    pub selected_repository: Option<String>,
    pub repositories: Option<Vec<Repository>>,
    pub openai_api_key: Option<String>,
    pub chat_model: Option<String>,
    pub image_model: Option<String>,
}

impl SessionRecord {
    /// True once a provider key has been stored for this session.
    pub fn is_configured(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .map_or(false, |key| !key.is_empty())
    }
}

/// Canonical repository record.
///
/// `full_name` is the first non-empty of `full_name`/`fullName`/`name`;
/// `url` is `url` falling back to `html_url`; `language` defaults to
/// "Unknown" the way the backend's own listing does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repository {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// URL used for connecting. `None` means the payload carried neither
    /// `url` nor `html_url`; callers must surface that instead of sending
    /// an empty string.
    pub fn connect_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// Raw wire shape of a repository, before normalization.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RepositoryPayload {
    id: Option<i64>,
    name: Option<String>,
    full_name: Option<String>,
    #[serde(rename = "fullName")]
    full_name_camel: Option<String>,
    description: Option<String>,
    private: Option<bool>,
    html_url: Option<String>,
    url: Option<String>,
    clone_url: Option<String>,
    language: Option<String>,
    updated_at: Option<String>,
}

// Empty strings count as absent, matching how the original consumers
// fell through `a || b` chains.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<RepositoryPayload> for Repository {
    fn from(raw: RepositoryPayload) -> Self {
        let name = raw.name.unwrap_or_default();
        let full_name = non_empty(raw.full_name)
            .or_else(|| non_empty(raw.full_name_camel))
            .unwrap_or_else(|| name.clone());
        let url = non_empty(raw.url).or_else(|| non_empty(raw.html_url));

        Self {
            id: raw.id,
            name,
            full_name,
            description: raw.description.unwrap_or_default(),
            private: raw.private.unwrap_or(false),
            url,
            clone_url: non_empty(raw.clone_url),
            language: non_empty(raw.language).unwrap_or_else(|| "Unknown".to_string()),
            updated_at: raw.updated_at.as_deref().and_then(parse_timestamp),
        }
    }
}

impl<'de> Deserialize<'de> for Repository {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RepositoryPayload::deserialize(deserializer).map(Repository::from)
    }
}

/// Authenticated GitHub identity.
#[derive(Debug, Clone, PartialEq)]
pub struct GitHubUser {
    pub username: String,
    pub display_name: String,
}

/// Result of an image generation call. `url` is the first entry of the
/// backend's `imageUrls` list.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    pub prompt: Option<String>,
    pub model: Option<String>,
}

/// Result of a multipart file upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upload {
    pub message: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub image_urls: Vec<String>,
    pub context: Option<String>,
}

impl Upload {
    /// URL worth showing for this upload: a generated image first, the
    /// hosted file otherwise.
    pub fn display_url(&self) -> Option<&str> {
        self.image_urls
            .first()
            .map(String::as_str)
            .or(self.file_url.as_deref())
    }
}

/// Reply from the agent endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentReply {
    pub success: bool,
    pub message: String,
    pub action: Option<String>,
    pub data: Option<serde_json::Value>,
    pub links: Option<Vec<String>>,
    pub reasoning: Option<String>,
}

impl Default for AgentReply {
    fn default() -> Self {
        Self {
            success: false,
            message: String::new(),
            action: None,
            data: None,
            links: None,
            reasoning: None,
        }
    }
}

/// Currently selected models, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    #[serde(rename = "selectedModel")]
    pub chat_model: String,
    #[serde(rename = "selectedImageModel")]
    pub image_model: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

// === Wire envelopes (crate-internal) ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReplyEnvelope {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AuthEnvelope {
    pub success: bool,
    pub username: Option<String>,
    pub name: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RepositoriesEnvelope {
    pub success: bool,
    pub repositories: Option<Vec<Repository>>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ConnectEnvelope {
    pub success: bool,
    pub files: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ImageEnvelope {
    pub image_urls: Option<Vec<String>>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct UploadEnvelope {
    pub message: Option<String>,
    pub error: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub context: Option<String>,
}

impl From<UploadEnvelope> for Upload {
    fn from(raw: UploadEnvelope) -> Self {
        Self {
            message: raw.message,
            file_name: raw.file_name,
            file_url: raw.file_url,
            image_urls: raw.image_urls.unwrap_or_default(),
            context: raw.context,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct SessionIdEnvelope {
    pub session_id: String,
}
