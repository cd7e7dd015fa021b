//! HTTP client for the assistant backend.
//!
//! One method per endpoint, one request per call. Non-2xx responses become
//! [`ApiError::Status`], 2xx envelopes carrying an `error` field become
//! [`ApiError::Backend`], and responses missing expected fields become
//! [`ApiError::Schema`]. Nothing here retries.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{
    AgentReply, AuthEnvelope, ConnectEnvelope, GeneratedImage, GitHubUser, ImageEnvelope,
    ModelSelection, ReplyEnvelope, RepositoriesEnvelope, Repository, SessionIdEnvelope,
    SessionRecord, Upload, UploadEnvelope,
};
use crate::Result;

/// Environment variable naming the backend base URL.
pub const BACKEND_URL_ENV: &str = "BANTER_BACKEND_URL";

/// Metadata attached to coding chat requests.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingMetadata {
    pub personal_access_token: String,
    pub repository_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_files: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// An empty URL is a configuration error, not a deferred failure.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::BackendUrlMissing);
        }

        let http = reqwest::Client::builder().build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads the body once; non-2xx carries the body text as the message.
    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Schema(e.to_string()))
    }

    /// For plain-text endpoints: 2xx returns the body, anything else errors.
    async fn expect_success(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    fn reply_text(reply: ReplyEnvelope) -> Result<String> {
        if let Some(error) = reply.error {
            return Err(ApiError::Backend(error));
        }
        reply
            .message
            .ok_or_else(|| ApiError::Schema("reply carried neither message nor error".to_string()))
    }

    // === Configuration ===

    /// Submits the provider credential and model selection.
    pub async fn configure(
        &self,
        api_key: &str,
        chat_model: &str,
        image_model: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "apiKey": api_key,
            "model": chat_model,
            "imageModel": image_model,
        });

        let response = self
            .http
            .post(self.endpoint("/api/configure"))
            .json(&body)
            .send()
            .await?;

        Self::expect_success(response).await?;
        debug!("backend configured");
        Ok(())
    }

    /// Form-encoded single-field model update; returns the confirmation text.
    pub async fn set_chat_model(&self, model: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/api/set-model"))
            .form(&[("model", model)])
            .send()
            .await?;

        Self::expect_success(response).await
    }

    pub async fn set_image_model(&self, model: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/api/set-image-model"))
            .form(&[("model", model)])
            .send()
            .await?;

        Self::expect_success(response).await
    }

    /// Fetches the backend's current model selection.
    pub async fn models(&self) -> Result<ModelSelection> {
        let response = self.http.get(self.endpoint("/api/models")).send().await?;
        Self::parse_json(response).await
    }

    // === Chat ===

    pub async fn chat(&self, message: &str) -> Result<String> {
        let body = serde_json::json!({ "message": message });
        let response = self
            .http
            .post(self.endpoint("/api/chat"))
            .json(&body)
            .send()
            .await?;

        let reply: ReplyEnvelope = Self::parse_json(response).await?;
        Self::reply_text(reply)
    }

    pub async fn upload_chat_file(&self, file_path: &Path) -> Result<Upload> {
        self.upload_multipart("/api/upload/chat", file_path, None)
            .await
    }

    // === Images ===

    pub async fn generate_image(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
        style: &str,
    ) -> Result<GeneratedImage> {
        let body = serde_json::json!({
            "prompt": prompt,
            "size": size,
            "quality": quality,
            "style": style,
        });

        let response = self
            .http
            .post(self.endpoint("/api/image"))
            .json(&body)
            .send()
            .await?;

        let envelope: ImageEnvelope = Self::parse_json(response).await?;
        if let Some(error) = envelope.error {
            return Err(ApiError::Backend(error));
        }

        let url = envelope
            .image_urls
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Schema("No image URL returned from backend".to_string()))?;

        Ok(GeneratedImage {
            url,
            prompt: envelope.prompt,
            model: envelope.model,
        })
    }

    pub async fn upload_image_file(
        &self,
        file_path: &Path,
        prompt: Option<&str>,
    ) -> Result<Upload> {
        self.upload_multipart("/api/upload-image", file_path, prompt)
            .await
    }

    async fn upload_multipart(
        &self,
        path: &str,
        file_path: &Path,
        prompt: Option<&str>,
    ) -> Result<Upload> {
        let bytes = tokio::fs::read(file_path).await?;
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }

        let response = self
            .http
            .post(self.endpoint(path))
            .multipart(form)
            .send()
            .await?;

        let envelope: UploadEnvelope = Self::parse_json(response).await?;
        if let Some(error) = envelope.error {
            return Err(ApiError::Backend(error));
        }
        Ok(envelope.into())
    }

    // === GitHub / coding ===

    pub async fn github_authenticate(&self, token: &str) -> Result<GitHubUser> {
        let body = serde_json::json!({ "personalAccessToken": token });
        let response = self
            .http
            .post(self.endpoint("/api/github/authenticate"))
            .json(&body)
            .send()
            .await?;

        let auth: AuthEnvelope = Self::parse_json(response).await?;
        if !auth.success {
            return Err(ApiError::Backend(
                auth.error
                    .unwrap_or_else(|| "Authentication failed".to_string()),
            ));
        }

        let username = auth
            .username
            .ok_or_else(|| ApiError::Schema("authentication reply missing username".to_string()))?;
        let display_name = auth.name.unwrap_or_else(|| username.clone());

        debug!(username = %username, "GitHub authentication succeeded");
        Ok(GitHubUser {
            username,
            display_name,
        })
    }

    /// Lists the token's repositories, normalized into canonical records.
    pub async fn github_repositories(&self, token: &str) -> Result<Vec<Repository>> {
        let body = serde_json::json!({ "personalAccessToken": token });
        let response = self
            .http
            .post(self.endpoint("/api/github/repositories"))
            .json(&body)
            .send()
            .await?;

        let envelope: RepositoriesEnvelope = Self::parse_json(response).await?;
        if !envelope.success {
            return Err(ApiError::Backend(
                envelope
                    .error
                    .unwrap_or_else(|| "Failed to fetch repositories".to_string()),
            ));
        }

        envelope
            .repositories
            .ok_or_else(|| ApiError::Schema("repository reply missing list".to_string()))
    }

    /// Connects a repository; returns the file paths available as context.
    pub async fn connect_repository(
        &self,
        token: &str,
        repository_url: &str,
    ) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "personalAccessToken": token,
            "repositoryUrl": repository_url,
        });

        let response = self
            .http
            .post(self.endpoint("/api/connect-repository"))
            .json(&body)
            .send()
            .await?;

        let envelope: ConnectEnvelope = Self::parse_json(response).await?;
        if !envelope.success {
            return Err(ApiError::Backend(
                envelope
                    .error
                    .unwrap_or_else(|| "Failed to connect to repository".to_string()),
            ));
        }

        Ok(envelope.files.unwrap_or_default())
    }

    pub async fn coding_chat(
        &self,
        message: &str,
        model: &str,
        metadata: &CodingMetadata,
    ) -> Result<String> {
        let body = serde_json::json!({
            "message": message,
            "model": model,
            "metadata": metadata,
        });

        let response = self
            .http
            .post(self.endpoint("/api/coding-chat"))
            .json(&body)
            .send()
            .await?;

        let reply: ReplyEnvelope = Self::parse_json(response).await?;
        Self::reply_text(reply)
    }

    pub async fn agent_coding_buddy(
        &self,
        message: &str,
        username: &str,
        repository: &str,
        token: &str,
    ) -> Result<AgentReply> {
        let body = serde_json::json!({
            "message": message,
            "username": username,
            "repository": repository,
            "personalAccessToken": token,
        });

        let response = self
            .http
            .post(self.endpoint("/api/agent/coding-buddy"))
            .json(&body)
            .send()
            .await?;

        Self::parse_json(response).await
    }

    // === Session store ===

    pub async fn generate_session(&self) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/api/session/generate"))
            .send()
            .await?;

        let envelope: SessionIdEnvelope = Self::parse_json(response).await?;
        if envelope.session_id.is_empty() {
            return Err(ApiError::Schema(
                "session generation returned no id".to_string(),
            ));
        }

        debug!(session_id = %envelope.session_id, "Generated session");
        Ok(envelope.session_id)
    }

    pub async fn fetch_session(&self, session_id: &str) -> Result<SessionRecord> {
        let response = self
            .http
            .get(self.endpoint(&format!("/api/session/{session_id}")))
            .send()
            .await?;

        Self::parse_json(response).await
    }

    pub async fn save_github_token(&self, session_id: &str, token: &str) -> Result<()> {
        self.post_session_field(session_id, "github-token", serde_json::json!({ "token": token }))
            .await
    }

    pub async fn save_github_user(
        &self,
        session_id: &str,
        username: &str,
        display_name: &str,
    ) -> Result<()> {
        self.post_session_field(
            session_id,
            "github-user",
            serde_json::json!({ "username": username, "displayName": display_name }),
        )
        .await
    }

    pub async fn save_selected_repository(
        &self,
        session_id: &str,
        repository: &str,
    ) -> Result<()> {
        self.post_session_field(
            session_id,
            "repository",
            serde_json::json!({ "repository": repository }),
        )
        .await
    }

    pub async fn save_repositories(
        &self,
        session_id: &str,
        repositories: &[Repository],
    ) -> Result<()> {
        self.post_session_field(
            session_id,
            "repositories",
            serde_json::json!({ "repositories": repositories }),
        )
        .await
    }

    pub async fn save_openai_config(
        &self,
        session_id: &str,
        api_key: &str,
        chat_model: &str,
        image_model: &str,
    ) -> Result<()> {
        self.post_session_field(
            session_id,
            "openai-config",
            serde_json::json!({
                "apiKey": api_key,
                "chatModel": chat_model,
                "imageModel": image_model,
            }),
        )
        .await
    }

    async fn post_session_field(
        &self,
        session_id: &str,
        field: &str,
        body: serde_json::Value,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("/api/session/{session_id}/{field}")))
            .json(&body)
            .send()
            .await?;

        Self::expect_success(response).await?;
        debug!(session_id = %session_id, field = %field, "Saved session field");
        Ok(())
    }

    /// Clears the whole GitHub field group server-side.
    pub async fn clear_github_data(&self, session_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/api/session/{session_id}/github")))
            .send()
            .await?;

        Self::expect_success(response).await?;
        Ok(())
    }

    /// Clears only the selected repository server-side.
    pub async fn clear_repository_data(&self, session_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/api/session/{session_id}/repository")))
            .send()
            .await?;

        Self::expect_success(response).await?;
        Ok(())
    }
}
