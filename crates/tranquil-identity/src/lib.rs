//! Identity layer for Tranquil.
//!
//! This crate defines who a user is, as far as the session core cares, and
//! how the core talks to the service that decides it:
//!
//! - **Types** ([`Identity`], [`UserId`], [`Credentials`], [`AuthChange`]) —
//!   the values exchanged with the identity provider.
//! - **Boundary** ([`IdentityProvider`] trait) — sign in, sign out, and the
//!   push subscription.
//! - **Errors** ([`ProviderError`], [`AuthError`]) — raw provider failures
//!   and their classification for the UI.
//! - **Reference adapter** ([`MemoryIdentityProvider`]) — an in-process
//!   provider for tests and demos.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← reconciles provider pushes with the cache
//!     ↕
//! Identity Layer (this crate)  ← identity types + provider boundary
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod identity;
mod memory;
mod provider;

pub use error::{AuthError, ProviderError, codes};
pub use identity::{AuthChange, Credentials, Identity, UserId, looks_like_email};
pub use memory::MemoryIdentityProvider;
pub use provider::{ChangeListener, IdentityProvider, Unsubscribe};
