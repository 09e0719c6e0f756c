//! Core identity types shared by every Tranquil layer.
//!
//! These are the values that cross the boundary between the client and the
//! identity provider:
//!
//! - [`UserId`] / [`Identity`] — WHO the provider says is signed in
//! - [`Credentials`] — what the user typed into the login form
//! - [`AuthChange`] — a push from the provider saying its belief changed

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The provider's stable identifier for an account.
///
/// A newtype over `String` so a user id can't be confused with an email or
/// any other string in a function signature. Provider uids are opaque; we
/// never parse them.
///
/// `#[serde(transparent)]` stores it as a plain JSON string, so a persisted
/// record reads `"id": "Xq3..."` rather than `"id": { "0": "Xq3..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The account the identity provider recognizes as signed in.
///
/// Only the two fields the client relies on are modelled. Everything else
/// the provider knows about a user (display name, photo, claims) lives in the
/// document store and is not the session core's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable provider uid.
    pub id: UserId,
    /// Email the account signed in with.
    pub email: String,
}

impl Identity {
    /// Creates an identity from a uid and an email.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            email: email.into(),
        }
    }

    /// Returns `true` if the identity carries both an id and an email.
    ///
    /// A provider push with an empty field can't be trusted to describe a
    /// real account, so callers treat it as malformed.
    pub fn is_well_formed(&self) -> bool {
        !self.id.0.trim().is_empty() && !self.email.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.id, self.email)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Email and password for an interactive sign-in or sign-up.
///
/// `Debug` is implemented by hand so the password never ends up in a log
/// line, even when a whole request is traced with `?credentials`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Loose syntactic check for an email address: `local@domain` with a dot in
/// the domain and no whitespace.
///
/// Providers do their own validation; this exists so reference adapters can
/// classify obviously broken input the same way a real provider would.
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// AuthChange — provider pushes
// ---------------------------------------------------------------------------

/// A notification from the identity provider that its idea of "who is
/// signed in" changed.
///
/// Providers deliver one of these as soon as a listener subscribes (their
/// current belief) and again after every change afterwards.
///
/// ```text
///   SignedIn(identity)   → the provider vouches for this account
///   SignedOut            → nobody is signed in
///   Malformed(reason)    → something arrived that couldn't be understood
/// ```
///
/// `Malformed` exists so adapters can hand unparseable payloads to the
/// session core instead of dropping them; the core fails closed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(Identity),
    SignedOut,
    Malformed(String),
}

impl AuthChange {
    /// Returns the identity the provider vouches for, if it is usable.
    ///
    /// A `SignedIn` whose identity is not well formed yields `None`, the
    /// same answer as `SignedOut` or `Malformed`.
    pub fn trusted_identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) if identity.is_well_formed() => {
                Some(identity)
            }
            _ => None,
        }
    }
}

impl From<Option<Identity>> for AuthChange {
    fn from(value: Option<Identity>) -> Self {
        match value {
            Some(identity) => Self::SignedIn(identity),
            None => Self::SignedOut,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // UserId / Identity
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let id = UserId::from("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""abc123""#);
    }

    #[test]
    fn test_identity_json_shape_matches_persisted_schema() {
        // The persisted record embeds the identity as {"id", "email"}.
        let identity = Identity::new("u-1", "a@x.com");
        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["id"], "u-1");
        assert_eq!(value["email"], "a@x.com");
    }

    #[test]
    fn test_identity_is_well_formed_rejects_blank_fields() {
        assert!(Identity::new("u-1", "a@x.com").is_well_formed());
        assert!(!Identity::new("", "a@x.com").is_well_formed());
        assert!(!Identity::new("u-1", "   ").is_well_formed());
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("u-1", "a@x.com");
        assert_eq!(identity.to_string(), "u-1 <a@x.com>");
    }

    // =====================================================================
    // Credentials
    // =====================================================================

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@x.com", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("a@x.com"));
        assert!(!printed.contains("hunter2"), "password leaked: {printed}");
    }

    #[test]
    fn test_looks_like_email_accepts_plain_address() {
        assert!(looks_like_email("a@x.com"));
        assert!(looks_like_email("first.last@spa.example.org"));
    }

    #[test]
    fn test_looks_like_email_rejects_broken_input() {
        for bad in ["", "a", "a@", "@x.com", "a@x", "a@@x.com", "a @x.com", "a@x.com."] {
            assert!(!looks_like_email(bad), "{bad:?} should be rejected");
        }
    }

    // =====================================================================
    // AuthChange
    // =====================================================================

    #[test]
    fn test_trusted_identity_only_for_well_formed_sign_in() {
        let good = AuthChange::SignedIn(Identity::new("u-1", "a@x.com"));
        assert!(good.trusted_identity().is_some());

        let blank = AuthChange::SignedIn(Identity::new("", ""));
        assert!(blank.trusted_identity().is_none());

        assert!(AuthChange::SignedOut.trusted_identity().is_none());
        assert!(
            AuthChange::Malformed("garbage".into())
                .trusted_identity()
                .is_none()
        );
    }

    #[test]
    fn test_auth_change_from_option() {
        let identity = Identity::new("u-1", "a@x.com");
        assert_eq!(
            AuthChange::from(Some(identity.clone())),
            AuthChange::SignedIn(identity)
        );
        assert_eq!(AuthChange::from(None), AuthChange::SignedOut);
    }
}
