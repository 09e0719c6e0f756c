//! # Tranquil
//!
//! Client-side session lifecycle core for the Tranquil spa-booking app.
//!
//! Tranquil decides whether the app is signed in and as whom. It restores
//! the last session from the device cache for a fast start, defers to the
//! identity provider whenever the two disagree, and logs the user out after
//! a period of inactivity. Screens only subscribe and call
//! `login`/`logout`; the [`SessionManager`](prelude::SessionManager) does
//! the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tranquil::prelude::*;
//!
//! # async fn run() -> Result<(), TranquilError> {
//! tranquil::telemetry::init();
//!
//! let manager = SessionManager::builder()
//!     .inactivity_timeout(std::time::Duration::from_secs(300))
//!     .start(FileStore::new("session.json"), MemoryIdentityProvider::new());
//!
//! match manager.wait_until_resolved().await? {
//!     SessionState::Authenticated => { /* show the app */ }
//!     _ => {
//!         manager.login(Credentials::new("a@x.com", "hunter22")).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | module       | crate               | contents                                 |
//! |--------------|---------------------|------------------------------------------|
//! | [`identity`] | `tranquil-identity` | identities, credentials, provider trait  |
//! | [`store`]    | `tranquil-store`    | session cache trait, record, codecs      |
//! | [`timer`]    | `tranquil-timer`    | generation-tagged inactivity timer       |
//! | [`session`]  | `tranquil-session`  | the session manager                      |

mod error;
pub mod telemetry;

pub use error::TranquilError;

pub use tranquil_identity as identity;
pub use tranquil_session as session;
pub use tranquil_store as store;
pub use tranquil_timer as timer;

/// Everything an app needs to drive a session.
pub mod prelude {
    pub use crate::TranquilError;
    pub use tranquil_identity::{
        AuthChange, AuthError, Credentials, Identity, IdentityProvider,
        MemoryIdentityProvider, ProviderError, UserId,
    };
    pub use tranquil_session::{
        LogoutReason, Session, SessionConfig, SessionError, SessionManager,
        SessionSource, SessionState, Subscription,
    };
    pub use tranquil_store::{FileStore, JsonCodec, MemoryStore, SessionStore, StoreError};
}
