//! Session lifecycle management for Tranquil.
//!
//! This crate decides, at every moment, whether the client is signed in and
//! as whom. It combines three inputs that disagree and arrive in any order:
//!
//! 1. **The device cache** — a fast, possibly stale record of the last
//!    session ([`SessionStore`](tranquil_store::SessionStore))
//! 2. **The identity provider** — the authority, which pushes sign-in state
//!    whenever it changes ([`IdentityProvider`](tranquil_identity::IdentityProvider))
//! 3. **The user** — logins, logouts, and activity that keeps the session
//!    alive ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! UI / screens (above)  ← subscribe to session changes, call login/logout
//!     ↕
//! Session Layer (this crate)  ← one task owns the session, timer, and subscribers
//!     ↕
//! Identity + Store + Timer (below)  ← provider, persisted cache, inactivity timer
//! ```
//!
//! # Ordering
//!
//! Every mutation runs on the manager's own task, one at a time. Two
//! callers racing to log in, a provider push arriving mid-logout, or an
//! expiry landing just after activity all resolve to the same outcome as
//! some sequential order of the same events.

mod actor;
mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::{SessionManager, SessionManagerBuilder, Subscription, SubscriberId};
pub use session::{LogoutReason, Session, SessionConfig, SessionSource, SessionState};
