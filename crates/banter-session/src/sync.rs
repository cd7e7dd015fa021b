//! Session record mirror
//!
//! Wraps the remote session store behind named mutators. Each mutator
//! performs one REST write and, on success, patches only its own field
//! group in the in-memory mirror. Nothing is applied optimistically, so a
//! failed write leaves the mirror exactly as it was.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use banter_api::{ApiClient, Repository, SessionRecord};
use banter_storage::Database;

use crate::Result;

/// Settings key holding the cached session id.
const SESSION_ID_KEY: &str = "session-id";

pub struct SessionSync {
    /// In-memory mirror of the server-held session record
    record: Arc<RwLock<Option<SessionRecord>>>,
    /// Most recent failure, rendered by the host view
    last_error: Arc<RwLock<Option<String>>>,
    /// Local settings store (session id cache)
    db: Database,
    /// Backend client
    api: ApiClient,
}

impl SessionSync {
    pub fn new(db: Database, api: ApiClient) -> Self {
        Self {
            record: Arc::new(RwLock::new(None)),
            last_error: Arc::new(RwLock::new(None)),
            db,
            api,
        }
    }

    /// Resolves the session id and loads its record into the mirror.
    ///
    /// A cached id is reused as-is; otherwise one is generated remotely and
    /// cached before the load. The cached id survives a failed load so the
    /// next start does not mint a fresh session.
    pub async fn initialize(&self) -> Result<()> {
        let cached = self.db.get_setting(SESSION_ID_KEY)?;

        let session_id = match cached.filter(|id| !id.is_empty()) {
            Some(id) => {
                debug!(session_id = %id, "Found existing session id");
                id
            }
            None => match self.api.generate_session().await {
                Ok(id) => {
                    self.db.set_setting(SESSION_ID_KEY, &id)?;
                    info!(session_id = %id, "Generated new session id");
                    id
                }
                Err(e) => {
                    self.set_error(format!("Failed to generate session: {e}"));
                    return Err(e.into());
                }
            },
        };

        self.load(&session_id).await
    }

    /// Re-fetches the record for the already-known id. No-op before
    /// initialization succeeds.
    pub async fn reload(&self) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        self.load(&session_id).await
    }

    async fn load(&self, session_id: &str) -> Result<()> {
        match self.api.fetch_session(session_id).await {
            Ok(record) => {
                info!(
                    session_id = %session_id,
                    configured = record.is_configured(),
                    "Loaded session record"
                );
                *self.record.write() = Some(record);
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to load session data: {e}"));
                Err(e.into())
            }
        }
    }

    // === Field-scoped mutators ===

    pub async fn save_github_token(&self, token: &str) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.api.save_github_token(&session_id, token).await {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.github_token = Some(token.to_string());
                }
                debug!(session_id = %session_id, "Saved GitHub token");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to save GitHub token: {e}"));
                Err(e.into())
            }
        }
    }

    pub async fn save_github_user(&self, username: &str, display_name: &str) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self
            .api
            .save_github_user(&session_id, username, display_name)
            .await
        {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.github_username = Some(username.to_string());
                    record.github_display_name = Some(display_name.to_string());
                }
                debug!(session_id = %session_id, username = %username, "Saved GitHub user");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to save GitHub user info: {e}"));
                Err(e.into())
            }
        }
    }

    pub async fn save_selected_repository(&self, repository: &str) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self
            .api
            .save_selected_repository(&session_id, repository)
            .await
        {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.selected_repository = Some(repository.to_string());
                }
                debug!(session_id = %session_id, repository = %repository, "Saved selected repository");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to save selected repository: {e}"));
                Err(e.into())
            }
        }
    }

    pub async fn save_repositories(&self, repositories: &[Repository]) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.api.save_repositories(&session_id, repositories).await {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.repositories = Some(repositories.to_vec());
                }
                debug!(
                    session_id = %session_id,
                    count = repositories.len(),
                    "Saved repository list"
                );
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to save repositories: {e}"));
                Err(e.into())
            }
        }
    }

    pub async fn save_openai_config(
        &self,
        api_key: &str,
        chat_model: &str,
        image_model: &str,
    ) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self
            .api
            .save_openai_config(&session_id, api_key, chat_model, image_model)
            .await
        {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.openai_api_key = Some(api_key.to_string());
                    record.chat_model = Some(chat_model.to_string());
                    record.image_model = Some(image_model.to_string());
                }
                debug!(session_id = %session_id, chat_model = %chat_model, "Saved provider config");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to save OpenAI config: {e}"));
                Err(e.into())
            }
        }
    }

    // === Field-group clears ===

    /// Clears the GitHub field group: token, user pair, selected repository,
    /// and repository list. Provider config is untouched.
    pub async fn clear_github_data(&self) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.api.clear_github_data(&session_id).await {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.github_token = None;
                    record.github_username = None;
                    record.github_display_name = None;
                    record.selected_repository = None;
                    record.repositories = None;
                }
                info!(session_id = %session_id, "Cleared GitHub data");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to clear GitHub data: {e}"));
                Err(e.into())
            }
        }
    }

    /// Clears only the selected repository; the repository list stays.
    pub async fn clear_repository_data(&self) -> Result<()> {
        let session_id = match self.guarded_session_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.api.clear_repository_data(&session_id).await {
            Ok(()) => {
                if let Some(record) = self.record.write().as_mut() {
                    record.selected_repository = None;
                }
                info!(session_id = %session_id, "Cleared repository selection");
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Failed to clear repository data: {e}"));
                Err(e.into())
            }
        }
    }

    // === Accessors ===

    /// Snapshot of the mirrored record.
    pub fn record(&self) -> Option<SessionRecord> {
        self.record.read().clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.guarded_session_id()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.record
            .read()
            .as_ref()
            .map_or(false, |record| record.is_configured())
    }

    /// Session id as mutators see it: present and non-empty, or nothing.
    fn guarded_session_id(&self) -> Option<String> {
        self.record
            .read()
            .as_ref()
            .map(|record| record.session_id.clone())
            .filter(|id| !id.is_empty())
    }

    fn set_error(&self, message: String) {
        warn!("{}", message);
        *self.last_error.write() = Some(message);
    }
}

impl Clone for SessionSync {
    fn clone(&self) -> Self {
        Self {
            record: Arc::clone(&self.record),
            last_error: Arc::clone(&self.last_error),
            db: self.db.clone(),
            api: self.api.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sync_with(db: &Database, server: &MockServer) -> SessionSync {
        let api = ApiClient::new(server.uri()).unwrap();
        SessionSync::new(db.clone(), api)
    }

    fn record_json(session_id: &str) -> serde_json::Value {
        serde_json::json!({
            "sessionId": session_id,
            "githubToken": "ghp_old",
            "githubUsername": "octocat",
            "githubDisplayName": "The Octocat",
            "selectedRepository": "octocat/one",
            "repositories": [{ "name": "one", "full_name": "octocat/one" }],
            "openaiApiKey": "sk-x",
            "chatModel": "gpt-4",
            "imageModel": "dall-e-3"
        })
    }

    #[tokio::test]
    async fn test_initialize_generates_id_once_when_cache_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "sessionId": "sess-new" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/session/sess-new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("sess-new")))
            .expect(1)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();

        assert_eq!(sync.session_id().as_deref(), Some("sess-new"));
        assert_eq!(
            db.get_setting("session-id").unwrap().as_deref(),
            Some("sess-new")
        );
        assert!(sync.is_configured());
    }

    #[tokio::test]
    async fn test_initialize_reuses_cached_id_without_generating() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/generate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .expect(1)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();

        assert_eq!(sync.session_id().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_failed_load_records_error_and_keeps_cached_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        assert!(sync.initialize().await.is_err());

        assert!(sync.record().is_none());
        assert!(sync
            .last_error()
            .unwrap()
            .contains("Failed to load session data"));
        // Cached id survives so the next start retries the same session
        assert_eq!(
            db.get_setting("session-id").unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn test_mutators_are_silent_noops_without_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        let sync = sync_with(&db, &server);

        sync.save_github_token("ghp_test").await.unwrap();
        sync.save_openai_config("sk", "gpt-4", "dall-e-3")
            .await
            .unwrap();
        sync.clear_github_data().await.unwrap();
        sync.reload().await.unwrap();

        assert!(sync.record().is_none());
        assert!(sync.last_error().is_none());
    }

    #[tokio::test]
    async fn test_mutators_treat_empty_session_id_as_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "sessionId": "" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/session//github-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();

        assert!(sync.session_id().is_none());
        sync.save_github_token("ghp_test").await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_save_updates_only_its_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/session/abc123/github-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "message": "GitHub token saved successfully" }),
            ))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();
        sync.save_github_token("ghp_test").await.unwrap();

        let record = sync.record().unwrap();
        assert_eq!(record.github_token.as_deref(), Some("ghp_test"));
        // Neighbouring fields keep their loaded values
        assert_eq!(record.github_username.as_deref(), Some("octocat"));
        assert_eq!(record.chat_model.as_deref(), Some("gpt-4"));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_mirror_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/session/abc123/github-token"))
            .respond_with(ResponseTemplate::new(500).set_body_string("write failed"))
            .expect(1)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();

        assert!(sync.save_github_token("ghp_test").await.is_err());

        let record = sync.record().unwrap();
        assert_eq!(record.github_token.as_deref(), Some("ghp_old"));
        assert!(sync
            .last_error()
            .unwrap()
            .contains("Failed to save GitHub token"));
    }

    #[tokio::test]
    async fn test_clear_github_nulls_exactly_the_github_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/session/abc123/github"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "message": "GitHub data cleared successfully" }),
            ))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();
        sync.clear_github_data().await.unwrap();

        let record = sync.record().unwrap();
        assert!(record.github_token.is_none());
        assert!(record.github_username.is_none());
        assert!(record.github_display_name.is_none());
        assert!(record.selected_repository.is_none());
        assert!(record.repositories.is_none());
        // Provider config is a different group
        assert_eq!(record.openai_api_key.as_deref(), Some("sk-x"));
        assert_eq!(record.chat_model.as_deref(), Some("gpt-4"));
        assert!(sync.is_configured());
    }

    #[tokio::test]
    async fn test_clear_repository_nulls_only_the_selection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/session/abc123/repository"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "message": "Repository data cleared successfully" }),
            ))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();
        sync.clear_repository_data().await.unwrap();

        let record = sync.record().unwrap();
        assert!(record.selected_repository.is_none());
        assert!(record.repositories.is_some());
        assert_eq!(record.github_token.as_deref(), Some("ghp_old"));
    }

    #[tokio::test]
    async fn test_reload_refreshes_the_mirror() {
        let server = MockServer::start().await;
        let mut stale = record_json("abc123");
        stale["githubToken"] = serde_json::Value::Null;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stale))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/session/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_json("abc123")))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().unwrap();
        db.set_setting("session-id", "abc123").unwrap();

        let sync = sync_with(&db, &server);
        sync.initialize().await.unwrap();
        assert!(sync.record().unwrap().github_token.is_none());

        sync.reload().await.unwrap();
        assert_eq!(
            sync.record().unwrap().github_token.as_deref(),
            Some("ghp_old")
        );
    }
}
