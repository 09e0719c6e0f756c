//! The session manager handle: what the UI holds on to.
//!
//! [`SessionManager`] is a cheap, cloneable front for the session actor.
//! Reads (`current_session`, `state`) are answered from a `watch` snapshot
//! without a round trip; everything that changes state is sent to the
//! actor as a command.
//!
//! ```text
//! SessionManager::builder()
//!     .inactivity_timeout(...)
//!     .start(store, provider) ──→ [Restoring]
//!                                   │
//!          login() / push ─────────┼──→ [Authenticated] ──→ logout() / timeout / push
//!                                   │                                 │
//!          push signed-out ────────┴──→ [Unauthenticated] ←──────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tranquil_identity::{AuthError, Credentials, IdentityProvider};
use tranquil_store::{Codec, JsonCodec, SessionStore};

use crate::actor::{self, Command, Snapshot};
use crate::{LogoutReason, Session, SessionConfig, SessionError, SessionState};

/// Identifies one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a running session manager.
///
/// Clones share the same underlying session. The manager keeps running
/// until [`shutdown`](Self::shutdown) is called or the last handle is
/// dropped.
#[derive(Clone)]
pub struct SessionManager {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Snapshot>,
    next_subscriber: Arc<AtomicU64>,
}

impl SessionManager {
    /// Returns a builder for configuring a manager before starting it.
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Starts a manager with the default configuration and JSON codec.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn start<S, P>(store: S, provider: P) -> Self
    where
        S: SessionStore,
        P: IdentityProvider,
    {
        Self::builder().start(store, provider)
    }

    /// Signs in with email and password.
    ///
    /// On success the new session is current, subscribers have been
    /// notified, and the store has taken the write (a failed write is
    /// logged, not returned). On failure nothing changes.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Login { credentials, reply }, rx)
            .await
            .unwrap_or_else(|e| Err(AuthError::Unknown(e.to_string())))
    }

    /// Creates an account and signs into it, like [`login`](Self::login).
    pub async fn sign_up(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::SignUp { credentials, reply }, rx)
            .await
            .unwrap_or_else(|e| Err(AuthError::Unknown(e.to_string())))
    }

    /// Asks the provider to email a password reset link. Does not touch
    /// the session.
    pub async fn request_password_reset(&self, email: impl Into<String>) -> Result<(), AuthError> {
        let (reply, rx) = oneshot::channel();
        let email = email.into();
        self.request(Command::PasswordReset { email, reply }, rx)
            .await
            .unwrap_or_else(|e| Err(AuthError::Unknown(e.to_string())))
    }

    /// Ends the current session.
    ///
    /// When this returns the session is gone and subscribers have heard.
    /// Deleting the cached record and signing out of the provider finish
    /// in the background; their errors are logged by the manager.
    ///
    /// Idempotent: logging out with nobody signed in does nothing.
    pub async fn logout(&self, reason: LogoutReason) {
        let (reply, rx) = oneshot::channel();
        if self.request(Command::Logout { reason, reply }, rx).await.is_err() {
            tracing::debug!(%reason, "logout on a stopped session manager");
        }
    }

    /// Pushes the inactivity deadline back. Cheap; call it on every tap.
    pub fn record_activity(&self) {
        let _ = self.commands.send(Command::Activity);
    }

    /// Registers `callback` to run with the current session after every
    /// change.
    ///
    /// If the manager has already resolved its startup state, the callback
    /// also runs once right away with the current value. Callbacks run on
    /// the manager's task and must not block. A callback that panics is
    /// logged and skipped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + 'static,
    {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let _ = self.commands.send(Command::Subscribe {
            id,
            callback: Box::new(callback),
        });
        Subscription {
            id,
            commands: self.commands.clone(),
        }
    }

    /// The current session, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.snapshot.borrow().session.clone()
    }

    /// Where the manager is in its lifecycle.
    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    /// Why the most recent session ended, if one has ended.
    pub fn last_logout(&self) -> Option<LogoutReason> {
        self.snapshot.borrow().last_logout
    }

    /// Whether the manager's task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Waits until the manager has left `Restoring` and returns the state
    /// it settled on.
    ///
    /// A splash screen awaits this before choosing between the login
    /// screen and the app.
    pub async fn wait_until_resolved(&self) -> Result<SessionState, SessionError> {
        let mut rx = self.snapshot.clone();
        let state = rx
            .wait_for(|s| s.state.is_resolved())
            .await
            .map_err(|_| SessionError::Stopped)?
            .state;
        Ok(state)
    }

    /// Stops the manager: cancels the timer, leaves the provider, and drops
    /// all subscribers. The persisted session is kept for the next start.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Shutdown { reply }, rx).await
    }

    async fn request<T>(
        &self,
        cmd: Command,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, SessionError> {
        self.commands.send(cmd).map_err(|_| SessionError::Stopped)?;
        rx.await.map_err(|_| SessionError::Stopped)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.borrow();
        f.debug_struct("SessionManager")
            .field("state", &snapshot.state)
            .field("session", &snapshot.session)
            .field("running", &self.is_running())
            .finish()
    }
}

/// A registered subscriber. Pass it to
/// [`unsubscribe`](Self::unsubscribe) to stop receiving changes.
///
/// Dropping a `Subscription` does *not* unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    /// The subscriber's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stops delivering changes to this subscriber. No further callbacks
    /// run once the manager has processed the request.
    pub fn unsubscribe(self) {
        let _ = self.commands.send(Command::Unsubscribe(self.id));
    }
}

/// Configures and starts a [`SessionManager`].
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tranquil_identity::MemoryIdentityProvider;
/// use tranquil_session::SessionManager;
/// use tranquil_store::MemoryStore;
///
/// # #[tokio::main] async fn main() {
/// let manager = SessionManager::builder()
///     .inactivity_timeout(Duration::from_secs(300))
///     .start(MemoryStore::new(), MemoryIdentityProvider::new());
/// manager.wait_until_resolved().await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionManagerBuilder<C = JsonCodec> {
    config: SessionConfig,
    codec: C,
}

impl SessionManagerBuilder<JsonCodec> {
    /// A builder with the default config and JSON codec.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            codec: JsonCodec,
        }
    }
}

impl Default for SessionManagerBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> SessionManagerBuilder<C> {
    /// Replaces the whole config.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how long a session survives without activity.
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.config.inactivity_timeout = timeout;
        self
    }

    /// Re-notify subscribers when the provider confirms the current
    /// identity.
    pub fn notify_on_identical_push(mut self, notify: bool) -> Self {
        self.config.notify_on_identical_push = notify;
        self
    }

    /// Uses `codec` to encode the persisted record.
    pub fn codec<C2: Codec>(self, codec: C2) -> SessionManagerBuilder<C2> {
        SessionManagerBuilder {
            config: self.config,
            codec,
        }
    }

    /// Starts the manager. It immediately enters `Restoring` and begins
    /// reading the cache and listening to the provider.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn start<S, P>(self, store: S, provider: P) -> SessionManager
    where
        S: SessionStore,
        P: IdentityProvider,
    {
        let config = self.config.validated();
        let (commands, snapshot) = actor::spawn_session(store, provider, self.codec, config);
        SessionManager {
            commands,
            snapshot,
            next_subscriber: Arc::new(AtomicU64::new(1)),
        }
    }
}
