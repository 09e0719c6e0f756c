//! Session actor: the single Tokio task that owns the session.
//!
//! Every mutation funnels through here. The outside world talks to the
//! actor through two channels:
//!
//! - **commands** from [`SessionManager`](crate::SessionManager) handles
//!   (login, logout, activity, subscribe, ...)
//! - **events** from the collaborators: the startup cache read, provider
//!   pushes, and inactivity expiries
//!
//! The actor processes one message at a time, so the session, the timer,
//! and the subscriber list never need a lock.
//!
//! The loop never waits on the store. Writes go to a writer task that
//! applies them in the order they were queued, and provider sign-outs and
//! reset emails run on tasks of their own. Only `login` and `sign_up`
//! await the provider inline.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tranquil_identity::{
    AuthChange, AuthError, Credentials, Identity, IdentityProvider, Unsubscribe,
};
use tranquil_store::{Codec, PersistedSession, SessionStore, StoreError};
use tranquil_timer::{Expiry, InactivityTimer};

use crate::manager::SubscriberId;
use crate::{LogoutReason, Session, SessionConfig, SessionSource, SessionState};

/// Callback invoked with the current session on every change.
pub(crate) type Subscriber = Box<dyn Fn(Option<&Session>) + Send + 'static>;

type SessionReply = oneshot::Sender<Result<Session, AuthError>>;

/// What the handles can read without a round trip to the actor.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub state: SessionState,
    pub session: Option<Session>,
    pub last_logout: Option<LogoutReason>,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            state: SessionState::Uninitialized,
            session: None,
            last_logout: None,
        }
    }
}

/// Commands sent to the session actor by its handles.
///
/// Variants with a `reply` are request/response; the caller awaits the
/// oneshot. The rest are fire-and-forget.
pub(crate) enum Command {
    /// Sign in with credentials.
    Login {
        credentials: Credentials,
        reply: SessionReply,
    },

    /// Create an account and sign into it.
    SignUp {
        credentials: Credentials,
        reply: SessionReply,
    },

    /// Ask the provider to send a password reset email.
    PasswordReset {
        email: String,
        reply: oneshot::Sender<Result<(), AuthError>>,
    },

    /// End the current session, if any.
    Logout {
        reason: LogoutReason,
        reply: oneshot::Sender<()>,
    },

    /// The user did something; push the inactivity deadline back.
    Activity,

    /// Register a change callback.
    Subscribe {
        id: SubscriberId,
        callback: Subscriber,
    },

    /// Drop a change callback.
    Unsubscribe(SubscriberId),

    /// Stop the actor.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Events produced by the actor's collaborators.
enum Event {
    /// The startup cache read finished.
    Restored(Result<Option<Vec<u8>>, StoreError>),
    /// The identity provider pushed a change.
    Push(AuthChange),
    /// The inactivity timer fired.
    Expired(Expiry),
}

/// A write queued for the store writer.
enum StoreOp {
    /// Replace the cached record. `accepted` hears back once the store has
    /// taken the write, successfully or not.
    Set {
        data: Vec<u8>,
        accepted: oneshot::Sender<Result<(), StoreError>>,
    },
    /// Delete the cached record.
    Clear,
}

/// Applies queued store writes one at a time, in order.
///
/// Runs until the actor drops its end of the queue, so writes queued just
/// before shutdown still land.
async fn run_store_writer<S: SessionStore>(
    store: Arc<S>,
    mut ops: mpsc::UnboundedReceiver<StoreOp>,
) {
    while let Some(op) = ops.recv().await {
        match op {
            StoreOp::Set { data, accepted } => {
                let result = store.set(data).await;
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "failed to persist session");
                }
                let _ = accepted.send(result);
            }
            StoreOp::Clear => {
                if let Err(e) = store.clear().await {
                    tracing::warn!(error = %e, "failed to clear session cache");
                }
            }
        }
    }
}

/// The internal session actor state. Runs inside a Tokio task.
struct SessionActor<S, P, C> {
    store: Arc<S>,
    writes: mpsc::UnboundedSender<StoreOp>,
    provider: Arc<P>,
    codec: C,
    config: SessionConfig,
    state: SessionState,
    session: Option<Session>,
    last_logout: Option<LogoutReason>,
    timer: InactivityTimer,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    snapshot: watch::Sender<Snapshot>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    provider_subscription: Option<Unsubscribe>,
    /// The latest provider sign-out, possibly still running.
    sign_out: Option<JoinHandle<()>>,
}

impl<S, P, C> SessionActor<S, P, C>
where
    S: SessionStore,
    P: IdentityProvider,
    C: Codec,
{
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(
            timeout_ms = self.config.inactivity_timeout.as_millis() as u64,
            "session manager started"
        );
        self.begin_restore();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        self.stop();
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        tracing::info!("session manager stopped");
    }

    /// Enters `Restoring`, kicks off the cache read, and subscribes to the
    /// provider. Whichever answers first is handled first.
    fn begin_restore(&mut self) {
        self.state = SessionState::Restoring;
        self.publish();

        let store = Arc::clone(&self.store);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = store.get().await;
            let _ = tx.send(Event::Restored(result));
        });

        let tx = self.events_tx.clone();
        let unsubscribe = self.provider.on_change(Box::new(move |change| {
            let _ = tx.send(Event::Push(change));
        }));
        self.provider_subscription = Some(unsubscribe);
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Login { credentials, reply } => self.handle_login(credentials, reply).await,
            Command::SignUp { credentials, reply } => {
                self.handle_sign_up(credentials, reply).await
            }
            Command::PasswordReset { email, reply } => {
                let provider = Arc::clone(&self.provider);
                tokio::spawn(async move {
                    let result = provider
                        .send_password_reset(&email)
                        .await
                        .map_err(AuthError::from);
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, "password reset request failed");
                    }
                    let _ = reply.send(result);
                });
            }
            Command::Logout { reason, reply } => {
                self.logout(reason);
                let _ = reply.send(());
            }
            Command::Activity => self.handle_activity(),
            Command::Subscribe { id, callback } => self.handle_subscribe(id, callback),
            Command::Unsubscribe(id) => {
                self.subscribers.retain(|(sid, _)| *sid != id);
                tracing::debug!(subscriber = id.0, "subscriber removed");
            }
            // Handled by the loop.
            Command::Shutdown { .. } => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Restored(result) => self.handle_restored(result),
            Event::Push(change) => self.handle_push(change),
            Event::Expired(expiry) => {
                if self.timer.claim(expiry) {
                    tracing::info!("session inactive, logging out");
                    self.logout(LogoutReason::Timeout);
                }
            }
        }
    }

    // -- User operations ----------------------------------------------------

    async fn handle_login(&mut self, credentials: Credentials, reply: SessionReply) {
        self.finish_sign_out().await;
        match self.provider.sign_in(&credentials).await {
            Ok(identity) => self.accept_interactive(identity, reply),
            Err(e) => {
                let err = AuthError::from(e);
                tracing::info!(error = %err, "login rejected");
                let _ = reply.send(Err(err));
            }
        }
    }

    async fn handle_sign_up(&mut self, credentials: Credentials, reply: SessionReply) {
        self.finish_sign_out().await;
        match self.provider.create_account(&credentials).await {
            Ok(identity) => self.accept_interactive(identity, reply),
            Err(e) => {
                let err = AuthError::from(e);
                tracing::info!(error = %err, "sign-up rejected");
                let _ = reply.send(Err(err));
            }
        }
    }

    /// Waits out a sign-out still in flight, so it cannot reach the
    /// provider after the sign-in that follows it.
    async fn finish_sign_out(&mut self) {
        if let Some(sign_out) = self.sign_out.take() {
            let _ = sign_out.await;
        }
    }

    /// Installs the identity a successful sign-in or sign-up returned.
    ///
    /// The caller hears back once the store has taken the write. The actor
    /// moves on right away.
    fn accept_interactive(&mut self, identity: Identity, reply: SessionReply) {
        if !identity.is_well_formed() {
            tracing::warn!("provider returned an incomplete identity");
            let _ = reply.send(Err(AuthError::Unknown(
                "identity provider returned an incomplete identity".into(),
            )));
            return;
        }
        let session = Session::new(identity, SessionSource::InteractiveLogin);
        self.establish(session.clone());
        let accepted = self.persist(&session);
        tracing::info!(user = %session.identity.id, "logged in");
        tokio::spawn(async move {
            let _ = accepted.await;
            let _ = reply.send(Ok(session));
        });
    }

    fn handle_activity(&mut self) {
        if self.session.is_some() {
            self.timer.arm();
        } else {
            tracing::trace!("activity without a session, ignoring");
        }
    }

    fn handle_subscribe(&mut self, id: SubscriberId, callback: Subscriber) {
        // A late subscriber still learns where things stand.
        if self.state.is_resolved() {
            call_subscriber(id, &callback, self.session.as_ref());
        }
        self.subscribers.push((id, callback));
        tracing::debug!(
            subscriber = id.0,
            subscribers = self.subscribers.len(),
            "subscriber added"
        );
    }

    // -- Reconciliation -----------------------------------------------------

    /// Applies the startup cache read.
    ///
    /// The cache only counts while nothing more authoritative has spoken.
    /// A record that shows up after the provider said "signed out" is
    /// stale and gets deleted.
    fn handle_restored(&mut self, result: Result<Option<Vec<u8>>, StoreError>) {
        let record = match result {
            Ok(Some(bytes)) => match PersistedSession::from_bytes(&self.codec, &bytes) {
                Ok(record) if record.identity.is_well_formed() => Some(record),
                Ok(_) => {
                    tracing::warn!("cached session is incomplete, discarding");
                    self.clear_store();
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cached session unreadable, discarding");
                    self.clear_store();
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "session cache unavailable");
                None
            }
        };

        match (self.state, record) {
            (SessionState::Restoring, Some(record)) => {
                tracing::info!(user = %record.identity.id, "session restored from cache");
                self.establish(Session {
                    identity: record.identity,
                    issued_at: record.issued_at,
                    source: SessionSource::RestoredFromCache,
                });
            }
            (SessionState::Restoring, None) => {
                tracing::debug!("no cached session, waiting for provider");
            }
            (SessionState::Unauthenticated, Some(record)) => {
                tracing::info!(
                    user = %record.identity.id,
                    "provider already signed out, dropping stale cache"
                );
                self.clear_store();
            }
            (state, _) => {
                tracing::debug!(%state, "cache resolved after provider, ignoring");
            }
        }
    }

    /// Applies a provider push. The provider always wins.
    fn handle_push(&mut self, change: AuthChange) {
        let Some(identity) = change.trusted_identity().cloned() else {
            if !matches!(change, AuthChange::SignedOut) {
                tracing::warn!(?change, "untrusted provider push, treating as signed out");
            }
            self.provider_signed_out();
            return;
        };

        if let Some(current) = &self.session {
            if current.identity == identity {
                tracing::debug!(user = %identity.id, "provider confirmed current session");
                if self.config.notify_on_identical_push {
                    self.notify();
                }
                return;
            }
        }

        tracing::info!(user = %identity.id, "provider pushed a session");
        let session = Session::new(identity, SessionSource::ProviderPushed);
        self.establish(session.clone());
        // Nobody waits on this write.
        drop(self.persist(&session));
    }

    fn provider_signed_out(&mut self) {
        if self.session.is_some() {
            self.logout(LogoutReason::Provider);
        } else if self.state == SessionState::Restoring {
            tracing::info!("provider reports nobody signed in");
            self.state = SessionState::Unauthenticated;
            self.publish();
            self.notify();
        } else {
            tracing::debug!("provider confirmed signed out");
        }
    }

    // -- Transitions --------------------------------------------------------

    /// Makes `session` current, arms the timer, and tells everyone.
    fn establish(&mut self, session: Session) {
        self.session = Some(session);
        self.state = SessionState::Authenticated;
        self.timer.arm();
        self.publish();
        self.notify();
    }

    /// Ends the current session. A no-op when nobody is signed in.
    ///
    /// In-memory state and subscribers are updated first. The cache delete
    /// queues behind any pending write, and the provider sign-out runs on
    /// its own task.
    fn logout(&mut self, reason: LogoutReason) {
        if self.session.is_none() {
            tracing::debug!(%reason, "logout without a session, ignoring");
            return;
        }

        self.timer.cancel();
        let ended = self.session.take();
        self.state = SessionState::Unauthenticated;
        self.last_logout = Some(reason);
        self.publish();
        self.notify();

        if let Some(ended) = ended {
            tracing::info!(user = %ended.identity.id, %reason, "logged out");
        }

        self.clear_store();

        if reason.signs_out_of_provider() {
            let provider = Arc::clone(&self.provider);
            self.sign_out = Some(tokio::spawn(async move {
                if let Err(e) = provider.sign_out().await {
                    tracing::warn!(error = %e, "provider sign-out failed");
                }
            }));
        }
    }

    // -- Plumbing -----------------------------------------------------------

    /// Queues `session` for the store. Failures are logged, never surfaced.
    ///
    /// The returned receiver resolves once the store has taken the write.
    fn persist(&self, session: &Session) -> oneshot::Receiver<Result<(), StoreError>> {
        let (accepted, rx) = oneshot::channel();
        let record = PersistedSession::new(session.identity.clone(), session.issued_at);
        match record.to_bytes(&self.codec) {
            Ok(data) => {
                let _ = self.writes.send(StoreOp::Set { data, accepted });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session");
                let _ = accepted.send(Err(e));
            }
        }
        rx
    }

    fn clear_store(&self) {
        let _ = self.writes.send(StoreOp::Clear);
    }

    /// Calls every subscriber with the current session.
    fn notify(&self) {
        let session = self.session.as_ref();
        for (id, callback) in &self.subscribers {
            call_subscriber(*id, callback, session);
        }
    }

    /// Refreshes what handles can read synchronously.
    fn publish(&self) {
        self.snapshot.send_replace(Snapshot {
            state: self.state,
            session: self.session.clone(),
            last_logout: self.last_logout,
        });
    }

    fn stop(&mut self) {
        self.timer.cancel();
        if let Some(unsubscribe) = self.provider_subscription.take() {
            unsubscribe();
        }
        self.subscribers.clear();
    }
}

/// Runs one subscriber. A callback that panics is logged and skipped
/// instead of taking the actor down.
fn call_subscriber(id: SubscriberId, callback: &Subscriber, session: Option<&Session>) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(session))).is_err() {
        tracing::warn!(subscriber = id.0, "subscriber panicked");
    }
}

/// Spawns a session actor and returns the ends its handles need.
///
/// Must be called from inside a Tokio runtime.
pub(crate) fn spawn_session<S, P, C>(
    store: S,
    provider: P,
    codec: C,
    config: SessionConfig,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<Snapshot>)
where
    S: SessionStore,
    P: IdentityProvider,
    C: Codec,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::initial());

    let store = Arc::new(store);
    let (writes, write_queue) = mpsc::unbounded_channel();
    tokio::spawn(run_store_writer(Arc::clone(&store), write_queue));

    let expiries = events_tx.clone();
    let timer = InactivityTimer::new(config.inactivity_timeout, move |expiry| {
        let _ = expiries.send(Event::Expired(expiry));
    });

    let actor = SessionActor {
        store,
        writes,
        provider: Arc::new(provider),
        codec,
        config,
        state: SessionState::Uninitialized,
        session: None,
        last_logout: None,
        timer,
        subscribers: Vec::new(),
        snapshot: snapshot_tx,
        commands: cmd_rx,
        events_tx,
        events: events_rx,
        provider_subscription: None,
        sign_out: None,
    };

    tokio::spawn(actor.run());

    (cmd_tx, snapshot_rx)
}
