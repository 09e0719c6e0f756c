//! The identity provider boundary.
//!
//! Tranquil doesn't authenticate anyone itself. A hosted identity service
//! does that, and Tranquil talks to it through the [`IdentityProvider`]
//! trait: sign in, sign out, and a push subscription that reports the
//! provider's current belief about who is signed in.
//!
//! Keeping this a trait means the session core runs unchanged against the
//! real service in the app, and against
//! [`MemoryIdentityProvider`](crate::MemoryIdentityProvider) in tests and
//! demos.

use std::future::Future;

use crate::{AuthChange, Credentials, Identity, ProviderError};

/// Callback invoked with every [`AuthChange`] the provider pushes.
///
/// Listeners are called from whatever context the provider delivers
/// notifications on, so they must be cheap and non-blocking. The session
/// manager's listener only forwards into a channel.
pub type ChangeListener = Box<dyn Fn(AuthChange) + Send + Sync + 'static>;

/// Releases a subscription made with [`IdentityProvider::on_change`].
pub type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// An external authority for authentication decisions.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the provider is shared with the session
///   manager's task for the whole process lifetime.
/// - The returned futures are `Send` so they can be awaited inside a
///   spawned Tokio task.
///
/// # Example
///
/// ```rust
/// use tranquil_identity::{
///     AuthChange, ChangeListener, Credentials, Identity, IdentityProvider,
///     ProviderError, Unsubscribe,
/// };
///
/// /// Signs everyone in as the same front-desk account.
/// /// Only for kiosks in development, never in production!
/// struct FrontDeskProvider;
///
/// impl IdentityProvider for FrontDeskProvider {
///     async fn sign_in(&self, creds: &Credentials) -> Result<Identity, ProviderError> {
///         Ok(Identity::new("front-desk", creds.email.clone()))
///     }
///
///     async fn sign_out(&self) -> Result<(), ProviderError> {
///         Ok(())
///     }
///
///     fn on_change(&self, listener: ChangeListener) -> Unsubscribe {
///         listener(AuthChange::SignedOut);
///         Box::new(|| {})
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Signs in with an email and password.
    ///
    /// # Returns
    /// - `Ok(Identity)` — the provider accepted the credentials
    /// - `Err(ProviderError)` — rejected; the code says why
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Identity, ProviderError>> + Send;

    /// Signs the current account out of the provider.
    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Subscribes to the provider's "who is signed in" notifications.
    ///
    /// The listener must be invoked once with the provider's current
    /// belief as part of subscribing (or shortly after), and again every
    /// time that belief changes. Returns a closure that ends the
    /// subscription.
    fn on_change(&self, listener: ChangeListener) -> Unsubscribe;

    /// Creates an account and signs it in.
    ///
    /// Default: the provider doesn't support self-service sign-up.
    fn create_account(
        &self,
        _credentials: &Credentials,
    ) -> impl Future<Output = Result<Identity, ProviderError>> + Send {
        async {
            Err(ProviderError::new(
                "auth/operation-not-allowed",
                "account creation is not supported by this provider",
            ))
        }
    }

    /// Sends a password-reset email.
    ///
    /// Default: not supported.
    fn send_password_reset(
        &self,
        _email: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        async {
            Err(ProviderError::new(
                "auth/operation-not-allowed",
                "password reset is not supported by this provider",
            ))
        }
    }
}
