//! Session types: the data structures that describe the client's login.
//!
//! A "session" is the client's current belief about who is signed in. It
//! tracks:
//! - WHO the provider says the user is (`Identity`)
//! - WHEN the session became active in this process (`issued_at`)
//! - WHERE that belief came from (`SessionSource`)

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;
use tranquil_identity::Identity;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Sensible defaults are provided; override just the fields you care about
/// with struct update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use tranquil_session::SessionConfig;
///
/// let config = SessionConfig {
///     inactivity_timeout: Duration::from_secs(300),
///     ..SessionConfig::default()
/// };
/// assert!(!config.notify_on_identical_push);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a session may go without recorded activity before it is
    /// logged out with reason `timeout`.
    ///
    /// Default: 15 seconds.
    pub inactivity_timeout: Duration,

    /// Whether subscribers are re-notified when the provider pushes the
    /// identity the client already holds. Useful for UIs that want a
    /// "verified" signal after an optimistic restore.
    ///
    /// Default: `false`.
    pub notify_on_identical_push: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Self::DEFAULT_INACTIVITY_TIMEOUT,
            notify_on_identical_push: false,
        }
    }
}

impl SessionConfig {
    /// Default inactivity timeout.
    pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15);

    /// Shortest inactivity timeout accepted.
    pub const MIN_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(1);

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically when a session manager is started.
    pub fn validated(mut self) -> Self {
        if self.inactivity_timeout < Self::MIN_INACTIVITY_TIMEOUT {
            warn!(
                requested_ms = self.inactivity_timeout.as_millis() as u64,
                min_ms = Self::MIN_INACTIVITY_TIMEOUT.as_millis() as u64,
                "inactivity_timeout below minimum, clamping"
            );
            self.inactivity_timeout = Self::MIN_INACTIVITY_TIMEOUT;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session manager is in its lifecycle.
///
/// ```text
///   Uninitialized ──(start)──→ Restoring ──(cache hit | push signed-in)──→ Authenticated
///                                  │                                        │    ↑
///                                  │                     (logout: manual,   │    │ (login, push)
///                                  │                      timeout, provider)│    │
///                                  └──(push signed-out)──→ Unauthenticated ←┘────┘
/// ```
///
/// There is no terminal state; the machine lives as long as the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed, not yet started.
    Uninitialized,
    /// Waiting for the cache read or the provider's first push.
    Restoring,
    /// A session is active.
    Authenticated,
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    /// Returns `true` once the manager has left `Restoring`, i.e. the UI
    /// can decide between the login screen and the app.
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Authenticated | Self::Unauthenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Restoring => write!(f, "Restoring"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Unauthenticated => write!(f, "Unauthenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSource / LogoutReason
// ---------------------------------------------------------------------------

/// How the current session came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionSource {
    /// The user typed credentials into this client.
    InteractiveLogin,
    /// Read back from the device cache at startup, not yet contradicted.
    RestoredFromCache,
    /// The identity provider reported it.
    ProviderPushed,
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InteractiveLogin => write!(f, "interactive-login"),
            Self::RestoredFromCache => write!(f, "restored-from-cache"),
            Self::ProviderPushed => write!(f, "provider-pushed"),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutReason {
    /// The user asked to log out.
    Manual,
    /// The inactivity timer expired.
    Timeout,
    /// The identity provider reported that nobody is signed in.
    Provider,
}

impl LogoutReason {
    /// Whether ending a session for this reason must also sign out of the
    /// identity provider. A provider-initiated logout already happened on
    /// the provider's side.
    pub fn signs_out_of_provider(self) -> bool {
        !matches!(self, Self::Provider)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Timeout => write!(f, "timeout"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated identity the client currently recognizes.
///
/// At most one exists at a time, owned by the session manager. Everything
/// else gets clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Who is signed in.
    pub identity: Identity,
    /// When this session became active in this process (ms since epoch).
    pub issued_at: u64,
    /// How the session was established.
    pub source: SessionSource,
}

impl Session {
    /// Creates a session issued now.
    pub fn new(identity: Identity, source: SessionSource) -> Self {
        Self {
            identity,
            issued_at: now_epoch_ms(),
            source,
        }
    }

    /// Shorthand for the signed-in email.
    pub fn email(&self) -> &str {
        &self.identity.email
    }
}

/// Milliseconds since the Unix epoch, by the wall clock.
///
/// A clock set before 1970 reads as 0 rather than failing; the value is
/// informational and never used for expiry.
pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.inactivity_timeout, Duration::from_secs(15));
        assert!(!config.notify_on_identical_push);
    }

    #[test]
    fn test_validated_clamps_short_timeout() {
        let config = SessionConfig {
            inactivity_timeout: Duration::from_millis(10),
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.inactivity_timeout, SessionConfig::MIN_INACTIVITY_TIMEOUT);
    }

    #[test]
    fn test_validated_keeps_valid_timeout() {
        let config = SessionConfig {
            inactivity_timeout: Duration::from_secs(3600),
            ..SessionConfig::default()
        }
        .validated();
        assert_eq!(config.inactivity_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_session_state_is_resolved() {
        assert!(!SessionState::Uninitialized.is_resolved());
        assert!(!SessionState::Restoring.is_resolved());
        assert!(SessionState::Authenticated.is_resolved());
        assert!(SessionState::Unauthenticated.is_resolved());
    }

    #[test]
    fn test_session_source_display_matches_serde() {
        for source in [
            SessionSource::InteractiveLogin,
            SessionSource::RestoredFromCache,
            SessionSource::ProviderPushed,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{source}\""));
        }
    }

    #[test]
    fn test_logout_reason_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogoutReason::Manual).unwrap(), "\"manual\"");
        assert_eq!(serde_json::to_string(&LogoutReason::Timeout).unwrap(), "\"timeout\"");
        assert_eq!(serde_json::to_string(&LogoutReason::Provider).unwrap(), "\"provider\"");
    }

    #[test]
    fn test_only_provider_logout_skips_provider_sign_out() {
        assert!(LogoutReason::Manual.signs_out_of_provider());
        assert!(LogoutReason::Timeout.signs_out_of_provider());
        assert!(!LogoutReason::Provider.signs_out_of_provider());
    }

    #[test]
    fn test_session_new_stamps_issue_time() {
        let before = now_epoch_ms();
        let session = Session::new(
            Identity::new("u-1", "a@x.com"),
            SessionSource::InteractiveLogin,
        );
        assert!(session.issued_at >= before);
        assert_eq!(session.email(), "a@x.com");
    }
}
