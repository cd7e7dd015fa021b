//! Coding buddy tab controller
//!
//! Drives the GitHub flow: authenticate with a personal access token, list
//! repositories, connect one, then chat with repository context. Status
//! moves through [`CodingStatus`]; every operation issues at most one
//! network call, and authentication is the one composite action (a
//! successful auth immediately lists repositories).
//!
//! Connection state that the remote session store also tracks (token, user
//! pair, repository list, selection) is pushed through the session mirror
//! as a side effect; those writes never block or fail the tab itself.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use banter_api::{ApiClient, ApiError, CodingMetadata, GitHubUser, Repository};
use banter_session::SessionSync;
use banter_storage::Database;

use crate::message::{Message, MessageLog};
use crate::state::CodingStatus;

/// Cache name for the coding transcript.
const CODING_MESSAGES_CACHE: &str = "coding-tab-messages";

const WELCOME_MESSAGE: &str = "Hello! I'm your Coding Buddy. Enter your GitHub Personal Access Token to get started. I'll help you with best practices, code reviews, refactoring suggestions, and development tasks.";

pub struct CodingController {
    log: MessageLog,
    status: Arc<RwLock<CodingStatus>>,
    token: Arc<RwLock<Option<String>>>,
    user: Arc<RwLock<Option<GitHubUser>>>,
    repositories: Arc<RwLock<Vec<Repository>>>,
    selected_repository: Arc<RwLock<Option<Repository>>>,
    available_files: Arc<RwLock<Vec<String>>>,
    selected_files: Arc<RwLock<Vec<String>>>,
    is_loading: Arc<RwLock<bool>>,
    auth_error: Arc<RwLock<Option<String>>>,
    api: ApiClient,
    session: SessionSync,
}

impl CodingController {
    /// Restores the transcript and greets on the first ever start.
    /// Connection state always starts from scratch; tokens are not
    /// replayed from disk.
    pub fn new(db: Database, api: ApiClient, session: SessionSync) -> Self {
        let log = MessageLog::new(db, CODING_MESSAGES_CACHE);
        if log.is_empty() {
            log.append(Message::assistant(WELCOME_MESSAGE));
        }

        Self {
            log,
            status: Arc::new(RwLock::new(CodingStatus::Unauthenticated)),
            token: Arc::new(RwLock::new(None)),
            user: Arc::new(RwLock::new(None)),
            repositories: Arc::new(RwLock::new(Vec::new())),
            selected_repository: Arc::new(RwLock::new(None)),
            available_files: Arc::new(RwLock::new(Vec::new())),
            selected_files: Arc::new(RwLock::new(Vec::new())),
            is_loading: Arc::new(RwLock::new(false)),
            auth_error: Arc::new(RwLock::new(None)),
            api,
            session,
        }
    }

    /// Submits the personal access token. On success the user pair is
    /// stored, the session mirror updated, and the repository listing
    /// kicked off immediately.
    pub async fn authenticate(&self, token: &str) {
        if !self.session.is_configured() {
            return;
        }

        if token.trim().is_empty() {
            *self.auth_error.write() = Some("Personal Access Token is required".to_string());
            return;
        }

        self.set_status(CodingStatus::Authenticating);
        *self.auth_error.write() = None;

        match self.api.github_authenticate(token).await {
            Ok(user) => {
                *self.token.write() = Some(token.to_string());
                *self.user.write() = Some(user.clone());
                self.set_status(CodingStatus::Authenticated);
                self.log.append(Message::assistant(format!(
                    "Successfully authenticated as {} (@{})",
                    user.display_name, user.username
                )));

                if let Err(e) = self.session.save_github_token(token).await {
                    debug!(error = %e, "GitHub token not mirrored to session");
                }
                if let Err(e) = self
                    .session
                    .save_github_user(&user.username, &user.display_name)
                    .await
                {
                    debug!(error = %e, "GitHub user not mirrored to session");
                }

                self.fetch_repositories().await;
            }
            Err(e) => {
                let text = match e {
                    ApiError::Backend(message) => message,
                    _ => "Authentication failed. Please check your Personal Access Token."
                        .to_string(),
                };
                *self.auth_error.write() = Some(text);
                self.set_status(CodingStatus::Unauthenticated);
            }
        }
    }

    /// Lists the authenticated user's repositories.
    pub async fn fetch_repositories(&self) {
        let token = match self.token.read().clone() {
            Some(token) => token,
            None => return,
        };

        self.set_status(CodingStatus::FetchingRepositories);

        match self.api.github_repositories(&token).await {
            Ok(repositories) => {
                self.log.append(Message::assistant(format!(
                    "Found {} repositories. Select one to connect.",
                    repositories.len()
                )));
                *self.repositories.write() = repositories.clone();
                self.set_status(CodingStatus::RepositoryListReady);

                if let Err(e) = self.session.save_repositories(&repositories).await {
                    debug!(error = %e, "Repository list not mirrored to session");
                }
            }
            Err(e) => {
                let text = match e {
                    ApiError::Backend(message) => {
                        format!("Failed to fetch repositories: {message}")
                    }
                    _ => "Failed to fetch repositories. Please try again.".to_string(),
                };
                self.log.append(Message::assistant(text));
                self.set_status(CodingStatus::Authenticated);
            }
        }
    }

    /// Connects a repository from the list. A repository without any usable
    /// URL is rejected inline before the network is touched.
    pub async fn connect(&self, repository: &Repository) {
        self.set_status(CodingStatus::Connecting);
        *self.selected_repository.write() = Some(repository.clone());

        let repository_url = match repository.connect_url() {
            Some(url) => url.to_string(),
            None => {
                self.set_status(CodingStatus::Error);
                self.log.append(Message::assistant(
                    "Error: No repository URL found. Please try again.",
                ));
                return;
            }
        };

        let token = self.token.read().clone().unwrap_or_default();

        match self.api.connect_repository(&token, &repository_url).await {
            Ok(files) => {
                *self.available_files.write() = files;
                self.selected_files.write().clear();
                self.set_status(CodingStatus::Connected);
                self.log.append(Message::assistant(format!(
                    "Connected to repository: {}. I'm your coding buddy and I'll help you with best practices, code reviews, refactoring suggestions, and development tasks. I have access to the codebase context and can analyze files, suggest improvements, and help with debugging.",
                    repository.full_name
                )));

                if let Err(e) = self
                    .session
                    .save_selected_repository(&repository.full_name)
                    .await
                {
                    debug!(error = %e, "Repository selection not mirrored to session");
                }
            }
            Err(e) => {
                self.set_status(CodingStatus::Error);
                let text = match e {
                    ApiError::Backend(message) => {
                        format!("Failed to connect to repository: {message}")
                    }
                    _ => "Error connecting to repository. Please try again.".to_string(),
                };
                self.log.append(Message::assistant(text));
            }
        }
    }

    /// Sends one coding chat message with repository context. Requires a
    /// connected repository; otherwise a silent no-op like the input guard.
    pub async fn send(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() || !self.session.is_configured() || !self.status().is_connected() {
            return;
        }

        let metadata = match self.chat_metadata() {
            Some(metadata) => metadata,
            None => return,
        };

        self.log.append(Message::user(text));
        *self.is_loading.write() = true;

        // The coding endpoint always runs against gpt-4 regardless of the
        // configured chat model.
        match self.api.coding_chat(text, "gpt-4", &metadata).await {
            Ok(reply) => {
                self.log.append(Message::assistant(reply));
            }
            Err(e) => {
                warn!(error = %e, "Coding chat failed");
                self.log.append(Message::assistant(
                    "Sorry, I encountered an error. Please try again.",
                ));
            }
        }

        *self.is_loading.write() = false;
    }

    /// Toggles a file in the analysis selection.
    pub fn toggle_file(&self, path: &str) {
        let mut selected = self.selected_files.write();
        if let Some(index) = selected.iter().position(|f| f == path) {
            selected.remove(index);
        } else {
            selected.push(path.to_string());
        }
    }

    /// Asks for insights on the selected files through the regular chat
    /// path. No-op when nothing is selected.
    pub async fn analyze_selected_files(&self) {
        let files = self.selected_files.read().clone();
        if files.is_empty() {
            return;
        }

        let metadata = match self.chat_metadata() {
            Some(metadata) => metadata,
            None => return,
        };

        let message = format!(
            "Please analyze these files and provide insights: {}",
            files.join(", ")
        );
        self.log.append(Message::user(message.as_str()));
        *self.is_loading.write() = true;

        match self.api.coding_chat(&message, "gpt-4", &metadata).await {
            Ok(reply) => {
                self.log.append(Message::assistant(reply));
            }
            Err(e) => {
                warn!(error = %e, "File analysis failed");
                self.log.append(Message::assistant(
                    "Sorry, I encountered an error analyzing the files.",
                ));
            }
        }

        *self.is_loading.write() = false;
    }

    /// Drops the connected repository and returns to the list.
    pub async fn disconnect(&self) {
        if !self.status().is_connected() {
            return;
        }

        *self.selected_repository.write() = None;
        self.selected_files.write().clear();
        self.available_files.write().clear();
        self.set_status(CodingStatus::RepositoryListReady);
        self.log.append(Message::assistant(
            "Disconnected from repository. Select a new repository to continue.",
        ));

        if let Err(e) = self.session.clear_repository_data().await {
            debug!(error = %e, "Repository selection not cleared from session");
        }
    }

    /// Full reset back to the token prompt.
    pub async fn logout(&self) {
        if !self.status().is_authenticated() {
            return;
        }

        *self.token.write() = None;
        *self.user.write() = None;
        self.repositories.write().clear();
        *self.selected_repository.write() = None;
        self.selected_files.write().clear();
        self.available_files.write().clear();
        *self.auth_error.write() = None;
        self.set_status(CodingStatus::Unauthenticated);
        self.log.append(Message::assistant(
            "Logged out. Authenticate again to continue.",
        ));

        if let Err(e) = self.session.clear_github_data().await {
            debug!(error = %e, "GitHub data not cleared from session");
        }
    }

    fn chat_metadata(&self) -> Option<CodingMetadata> {
        let token = self.token.read().clone()?;
        let repository = self.selected_repository.read().clone()?;
        let repository_url = repository.connect_url()?.to_string();
        let selected = self.selected_files.read().clone();

        Some(CodingMetadata {
            personal_access_token: token,
            repository_url,
            selected_files: if selected.is_empty() {
                None
            } else {
                Some(selected)
            },
        })
    }

    fn set_status(&self, next: CodingStatus) {
        let mut status = self.status.write();
        if !status.can_transition_to(next) {
            warn!(from = %*status, to = %next, "Ignoring invalid coding status transition");
            return;
        }
        debug!(from = %*status, to = %next, "Coding status changed");
        *status = next;
    }

    // === Accessors ===

    pub fn messages(&self) -> Vec<Message> {
        self.log.messages()
    }

    pub fn status(&self) -> CodingStatus {
        *self.status.read()
    }

    pub fn user(&self) -> Option<GitHubUser> {
        self.user.read().clone()
    }

    pub fn repositories(&self) -> Vec<Repository> {
        self.repositories.read().clone()
    }

    pub fn selected_repository(&self) -> Option<Repository> {
        self.selected_repository.read().clone()
    }

    pub fn available_files(&self) -> Vec<String> {
        self.available_files.read().clone()
    }

    pub fn selected_files(&self) -> Vec<String> {
        self.selected_files.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.is_loading.read()
    }

    pub fn auth_error(&self) -> Option<String> {
        self.auth_error.read().clone()
    }
}

impl Clone for CodingController {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            status: Arc::clone(&self.status),
            token: Arc::clone(&self.token),
            user: Arc::clone(&self.user),
            repositories: Arc::clone(&self.repositories),
            selected_repository: Arc::clone(&self.selected_repository),
            available_files: Arc::clone(&self.available_files),
            selected_files: Arc::clone(&self.selected_files),
            is_loading: Arc::clone(&self.is_loading),
            auth_error: Arc::clone(&self.auth_error),
            api: self.api.clone(),
            session: self.session.clone(),
        }
    }
}
