//! Tab identity and the coding tab status machine
//!
//! ```text
//! Unauthenticated
//!   ↓ credential submit          (failure returns to Unauthenticated)
//! Authenticating → Authenticated
//!   ↓ automatic after auth       (failure returns to Authenticated)
//! FetchingRepositories → RepositoryListReady
//!   ↓ repository pick            (failure → Error, retry by picking again)
//! Connecting → Connected
//! ```
//!
//! Disconnect returns to `RepositoryListReady`; logout resets to
//! `Unauthenticated` from anywhere.

use serde::{Deserialize, Serialize};

/// Which feature tab the shell is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TabKind {
    #[default]
    Chat,
    Image,
    Coding,
}

impl TabKind {
    pub const ALL: [TabKind; 3] = [TabKind::Chat, TabKind::Image, TabKind::Coding];

    pub fn next(self) -> Self {
        match self {
            TabKind::Chat => TabKind::Image,
            TabKind::Image => TabKind::Coding,
            TabKind::Coding => TabKind::Chat,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            TabKind::Chat => TabKind::Coding,
            TabKind::Image => TabKind::Chat,
            TabKind::Coding => TabKind::Image,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TabKind::Chat => "Chat",
            TabKind::Image => "Images",
            TabKind::Coding => "Coding Buddy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodingStatus {
    /// No GitHub credential submitted yet
    Unauthenticated,
    /// Credential submitted, waiting on the auth endpoint
    Authenticating,
    /// Credential accepted
    Authenticated,
    /// Repository listing in flight
    FetchingRepositories,
    /// Repositories loaded, waiting for a pick
    RepositoryListReady,
    /// Repository pick in flight
    Connecting,
    /// Repository connected, chat enabled
    Connected,
    /// Connect failed; picking another repository retries
    Error,
}

impl CodingStatus {
    /// Check if transition to another status is valid
    pub fn can_transition_to(&self, target: CodingStatus) -> bool {
        match (self, target) {
            (CodingStatus::Unauthenticated, CodingStatus::Authenticating) => true,
            // Auth resolves either way
            (CodingStatus::Authenticating, CodingStatus::Authenticated) => true,
            (CodingStatus::Authenticating, CodingStatus::Unauthenticated) => true,
            (CodingStatus::Authenticated, CodingStatus::FetchingRepositories) => true,
            // Listing resolves either way
            (CodingStatus::FetchingRepositories, CodingStatus::RepositoryListReady) => true,
            (CodingStatus::FetchingRepositories, CodingStatus::Authenticated) => true,
            (CodingStatus::RepositoryListReady, CodingStatus::Connecting) => true,
            // Connect resolves either way; a failed connect retries by picking again
            (CodingStatus::Connecting, CodingStatus::Connected) => true,
            (CodingStatus::Connecting, CodingStatus::Error) => true,
            (CodingStatus::Error, CodingStatus::Connecting) => true,
            // Disconnect returns to the repository list
            (CodingStatus::Connected, CodingStatus::RepositoryListReady) => true,
            // Logout is valid from anywhere
            (_, CodingStatus::Unauthenticated) => true,
            // Same status is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// True once a credential has been accepted
    pub fn is_authenticated(&self) -> bool {
        !matches!(
            self,
            CodingStatus::Unauthenticated | CodingStatus::Authenticating
        )
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, CodingStatus::Connected)
    }

    /// True while a network call driven by this machine is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CodingStatus::Authenticating
                | CodingStatus::FetchingRepositories
                | CodingStatus::Connecting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodingStatus::Unauthenticated => "unauthenticated",
            CodingStatus::Authenticating => "authenticating",
            CodingStatus::Authenticated => "authenticated",
            CodingStatus::FetchingRepositories => "fetching-repositories",
            CodingStatus::RepositoryListReady => "repository-list-ready",
            CodingStatus::Connecting => "connecting",
            CodingStatus::Connected => "connected",
            CodingStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for CodingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(CodingStatus::Unauthenticated.can_transition_to(CodingStatus::Authenticating));
        assert!(CodingStatus::Authenticating.can_transition_to(CodingStatus::Authenticated));
        assert!(CodingStatus::Authenticated.can_transition_to(CodingStatus::FetchingRepositories));
        assert!(
            CodingStatus::FetchingRepositories.can_transition_to(CodingStatus::RepositoryListReady)
        );
        assert!(CodingStatus::RepositoryListReady.can_transition_to(CodingStatus::Connecting));
        assert!(CodingStatus::Connecting.can_transition_to(CodingStatus::Connected));
    }

    #[test]
    fn test_failure_edges() {
        // Auth failure falls back
        assert!(CodingStatus::Authenticating.can_transition_to(CodingStatus::Unauthenticated));
        // Listing failure falls back
        assert!(CodingStatus::FetchingRepositories.can_transition_to(CodingStatus::Authenticated));
        // Connect failure parks in Error, retried by picking again
        assert!(CodingStatus::Connecting.can_transition_to(CodingStatus::Error));
        assert!(CodingStatus::Error.can_transition_to(CodingStatus::Connecting));
    }

    #[test]
    fn test_disconnect_and_logout() {
        assert!(CodingStatus::Connected.can_transition_to(CodingStatus::RepositoryListReady));
        // Logout from any status
        assert!(CodingStatus::Connected.can_transition_to(CodingStatus::Unauthenticated));
        assert!(CodingStatus::Error.can_transition_to(CodingStatus::Unauthenticated));
        assert!(
            CodingStatus::RepositoryListReady.can_transition_to(CodingStatus::Unauthenticated)
        );
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip authentication
        assert!(!CodingStatus::Unauthenticated.can_transition_to(CodingStatus::Connected));
        // Cannot connect without a repository list
        assert!(!CodingStatus::Authenticated.can_transition_to(CodingStatus::Connecting));
        // Connected tab picks a new repository only after disconnecting
        assert!(!CodingStatus::Connected.can_transition_to(CodingStatus::Connecting));
    }

    #[test]
    fn test_flags() {
        assert!(!CodingStatus::Authenticating.is_authenticated());
        assert!(CodingStatus::RepositoryListReady.is_authenticated());
        assert!(CodingStatus::Connected.is_connected());
        assert!(CodingStatus::Connecting.is_busy());
        assert!(!CodingStatus::Connected.is_busy());
    }

    #[test]
    fn test_tab_cycle_covers_every_tab() {
        let mut tab = TabKind::Chat;
        for expected in TabKind::ALL {
            assert_eq!(tab, expected);
            tab = tab.next();
        }
        assert_eq!(tab, TabKind::Chat);
        assert_eq!(TabKind::Chat.previous(), TabKind::Coding);
    }
}
