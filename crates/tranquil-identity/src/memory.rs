//! In-process identity provider for tests, demos, and offline development.
//!
//! Behaves like a hosted identity service as far as the session core can
//! tell: it keeps an account registry, answers with `auth/*` error codes,
//! and pushes [`AuthChange`] notifications to every listener (once on
//! subscription, then on each change).
//!
//! On top of that it exposes knobs a real service doesn't: forcing network
//! failures, revoking the signed-in account from the "server side", and
//! pushing arbitrary (even malformed) notifications.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::codes;
use crate::{
    AuthChange, ChangeListener, Credentials, Identity, IdentityProvider,
    ProviderError, Unsubscribe, looks_like_email,
};

/// Length of generated uids, matching what hosted providers hand out.
const UID_LEN: usize = 28;

/// Shortest password `create_account` accepts.
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
}

struct Registry {
    /// Accounts keyed by lowercased email.
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
    listeners: Vec<(u64, Arc<ChangeListener>)>,
    next_listener_id: u64,
    offline: bool,
    /// When set, subscribing doesn't deliver the current belief; it's held
    /// back until [`MemoryIdentityProvider::announce`] is called.
    defer_initial_push: bool,
    sign_in_calls: usize,
    sign_out_calls: usize,
    password_resets: Vec<String>,
}

/// A cheap-to-clone, in-memory [`IdentityProvider`].
///
/// Clones share the same registry, so a test can keep one clone for
/// inspection while the session manager owns another.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<Registry>>,
}

impl MemoryIdentityProvider {
    /// Creates a provider with no accounts and nobody signed in.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                accounts: HashMap::new(),
                current: None,
                listeners: Vec::new(),
                next_listener_id: 1,
                offline: false,
                defer_initial_push: false,
                sign_in_calls: 0,
                sign_out_calls: 0,
                password_resets: Vec::new(),
            })),
        }
    }

    /// Creates a provider that stays silent on subscription until
    /// [`announce`](Self::announce) is called.
    ///
    /// Models a provider that is slow to report its initial state at app
    /// start, which is exactly when the cached session matters.
    pub fn with_deferred_initial_push() -> Self {
        let provider = Self::new();
        provider.lock().defer_initial_push = true;
        provider
    }

    /// Adds an account without signing it in. Returns its identity.
    ///
    /// Re-registering an email replaces the password but keeps the uid.
    pub fn register(&self, email: &str, password: &str) -> Identity {
        let mut reg = self.lock();
        let key = email.to_lowercase();
        let identity = match reg.accounts.get(&key) {
            Some(existing) => existing.identity.clone(),
            None => Identity::new(generate_uid(), email),
        };
        reg.accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        identity
    }

    /// Makes every network-bound call fail with
    /// `auth/network-request-failed` while `offline` is true.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delivers the provider's current belief to every listener.
    ///
    /// Also turns off deferred mode, so later subscribers are answered
    /// immediately.
    pub fn announce(&self) {
        let change = {
            let mut reg = self.lock();
            reg.defer_initial_push = false;
            AuthChange::from(reg.current.clone())
        };
        self.broadcast(change);
    }

    /// Pushes an arbitrary change to every listener.
    ///
    /// `SignedIn` and `SignedOut` also update who the provider thinks is
    /// signed in; `Malformed` is delivered as-is and changes nothing.
    pub fn push(&self, change: AuthChange) {
        {
            let mut reg = self.lock();
            match &change {
                AuthChange::SignedIn(identity) => {
                    reg.current = Some(identity.clone());
                }
                AuthChange::SignedOut => reg.current = None,
                AuthChange::Malformed(_) => {}
            }
        }
        self.broadcast(change);
    }

    /// Ends the current sign-in from the provider side (e.g. an admin
    /// disabled the account) and notifies listeners.
    pub fn revoke(&self) {
        self.push(AuthChange::SignedOut);
    }

    /// Who the provider currently believes is signed in.
    pub fn current(&self) -> Option<Identity> {
        self.lock().current.clone()
    }

    /// Number of `sign_in` calls received, successful or not.
    pub fn sign_in_count(&self) -> usize {
        self.lock().sign_in_calls
    }

    /// Number of `sign_out` calls received.
    pub fn sign_out_count(&self) -> usize {
        self.lock().sign_out_calls
    }

    /// Number of active `on_change` subscriptions.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Emails that password resets were requested for, oldest first.
    pub fn password_reset_requests(&self) -> Vec<String> {
        self.lock().password_resets.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A listener that panicked mid-broadcast mustn't brick the provider.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invokes every listener with `change`.
    ///
    /// Listeners are cloned out first so none of them runs while the
    /// registry lock is held; a listener may call back into the provider.
    fn broadcast(&self, change: AuthChange) {
        let listeners: Vec<Arc<ChangeListener>> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        tracing::debug!(?change, listeners = listeners.len(), "provider push");
        for listener in listeners {
            listener(change.clone());
        }
    }

    /// Sets the signed-in account, notifying listeners only on change.
    fn set_current(&self, identity: Identity) {
        let changed = {
            let mut reg = self.lock();
            let changed = reg.current.as_ref() != Some(&identity);
            reg.current = Some(identity.clone());
            changed
        };
        if changed {
            self.broadcast(AuthChange::SignedIn(identity));
        }
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.lock().offline {
            return Err(ProviderError::new(
                codes::NETWORK_REQUEST_FAILED,
                "identity provider is unreachable",
            ));
        }
        Ok(())
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<Identity, ProviderError> {
        self.lock().sign_in_calls += 1;
        self.check_online()?;

        if !looks_like_email(&credentials.email) {
            return Err(ProviderError::new(
                codes::INVALID_EMAIL,
                "the email address is badly formatted",
            ));
        }

        let account = self
            .lock()
            .accounts
            .get(&credentials.email.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                ProviderError::new(
                    codes::USER_NOT_FOUND,
                    "no account for this email",
                )
            })?;

        if account.password != credentials.password {
            return Err(ProviderError::new(
                codes::WRONG_PASSWORD,
                "the password is invalid",
            ));
        }

        self.set_current(account.identity.clone());
        Ok(account.identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let was_signed_in = {
            let mut reg = self.lock();
            reg.sign_out_calls += 1;
            reg.current.take().is_some()
        };
        if was_signed_in {
            self.broadcast(AuthChange::SignedOut);
        }
        Ok(())
    }

    fn on_change(&self, listener: ChangeListener) -> Unsubscribe {
        let listener = Arc::new(listener);
        let (id, initial) = {
            let mut reg = self.lock();
            let id = reg.next_listener_id;
            reg.next_listener_id += 1;
            reg.listeners.push((id, Arc::clone(&listener)));
            let initial = (!reg.defer_initial_push)
                .then(|| AuthChange::from(reg.current.clone()));
            (id, initial)
        };

        if let Some(change) = initial {
            listener(change);
        }

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                let mut reg =
                    registry.lock().unwrap_or_else(PoisonError::into_inner);
                reg.listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
    ) -> Result<Identity, ProviderError> {
        self.check_online()?;

        if !looks_like_email(&credentials.email) {
            return Err(ProviderError::new(
                codes::INVALID_EMAIL,
                "the email address is badly formatted",
            ));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(
                codes::WEAK_PASSWORD,
                format!("password should be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if self
            .lock()
            .accounts
            .contains_key(&credentials.email.to_lowercase())
        {
            return Err(ProviderError::new(
                codes::EMAIL_ALREADY_IN_USE,
                "the email address is already in use by another account",
            ));
        }

        let identity = self.register(&credentials.email, &credentials.password);
        self.set_current(identity.clone());
        Ok(identity)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        self.check_online()?;
        if !looks_like_email(email) {
            return Err(ProviderError::new(
                codes::INVALID_EMAIL,
                "the email address is badly formatted",
            ));
        }
        let mut reg = self.lock();
        if !reg.accounts.contains_key(&email.to_lowercase()) {
            return Err(ProviderError::new(
                codes::USER_NOT_FOUND,
                "no account for this email",
            ));
        }
        reg.password_resets.push(email.to_string());
        Ok(())
    }
}

/// Generates a random alphanumeric uid.
fn generate_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect()
}
