//! Error types for the identity layer.
//!
//! Two levels:
//!
//! - [`ProviderError`] is what an [`IdentityProvider`](crate::IdentityProvider)
//!   reports: a raw, provider-specific error code plus a message.
//! - [`AuthError`] is what the rest of the client sees: a small, closed set of
//!   kinds the UI can present without knowing which provider is behind it.

/// Provider error codes understood by [`AuthError::from`].
///
/// The strings follow the `auth/<kind>` convention used by hosted identity
/// services, so an adapter can usually pass the provider's own code through
/// unchanged.
pub mod codes {
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const INVALID_LOGIN_CREDENTIALS: &str = "auth/invalid-login-credentials";
    pub const MISSING_PASSWORD: &str = "auth/missing-password";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const MISSING_EMAIL: &str = "auth/missing-email";
    pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
    pub const TIMEOUT: &str = "auth/timeout";
    pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
}

/// A failure reported by the identity provider.
///
/// `code` drives classification; `message` is kept for logs and for the
/// `Unknown` fallback, where it's the only useful thing we can show.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Classified authentication failure returned by `login`, `sign_up`, and
/// `request_password_reset`.
///
/// These are values, not panics: the caller decides how to present them
/// (an alert, an inline form error, a retry button).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The password (or the email/password pair) was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account exists for this email.
    #[error("no account found for this email")]
    AccountNotFound,

    /// The email isn't syntactically valid.
    #[error("malformed email address")]
    MalformedEmail,

    /// The provider couldn't be reached, or didn't answer in time.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Sign-up only: an account with this email already exists.
    #[error("an account with this email already exists")]
    EmailInUse,

    /// Sign-up only: the provider rejected the password as too weak.
    #[error("password is too weak")]
    WeakPassword,

    /// Anything the classification doesn't recognize.
    #[error("authentication failed: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Returns `true` if retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err.code.as_str() {
            codes::WRONG_PASSWORD
            | codes::INVALID_CREDENTIAL
            | codes::INVALID_LOGIN_CREDENTIALS
            | codes::MISSING_PASSWORD => Self::InvalidCredentials,
            codes::USER_NOT_FOUND => Self::AccountNotFound,
            codes::INVALID_EMAIL | codes::MISSING_EMAIL => Self::MalformedEmail,
            codes::NETWORK_REQUEST_FAILED | codes::TIMEOUT => {
                Self::NetworkError(err.message)
            }
            codes::EMAIL_ALREADY_IN_USE => Self::EmailInUse,
            codes::WEAK_PASSWORD => Self::WeakPassword,
            _ => Self::Unknown(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(code: &str) -> AuthError {
        AuthError::from(ProviderError::new(code, "boom"))
    }

    #[test]
    fn test_classify_credential_codes_as_invalid_credentials() {
        assert_eq!(classify(codes::WRONG_PASSWORD), AuthError::InvalidCredentials);
        assert_eq!(classify(codes::INVALID_CREDENTIAL), AuthError::InvalidCredentials);
        assert_eq!(classify(codes::MISSING_PASSWORD), AuthError::InvalidCredentials);
    }

    #[test]
    fn test_classify_user_not_found() {
        assert_eq!(classify(codes::USER_NOT_FOUND), AuthError::AccountNotFound);
    }

    #[test]
    fn test_classify_invalid_email() {
        assert_eq!(classify(codes::INVALID_EMAIL), AuthError::MalformedEmail);
    }

    #[test]
    fn test_classify_network_keeps_message() {
        let err = classify(codes::NETWORK_REQUEST_FAILED);
        assert_eq!(err, AuthError::NetworkError("boom".into()));
        assert!(err.is_transient());
    }

    #[test]
    fn test_classify_sign_up_codes() {
        assert_eq!(classify(codes::EMAIL_ALREADY_IN_USE), AuthError::EmailInUse);
        assert_eq!(classify(codes::WEAK_PASSWORD), AuthError::WeakPassword);
    }

    #[test]
    fn test_classify_unrecognized_code_is_unknown() {
        let err = classify("auth/something-new");
        assert!(
            matches!(&err, AuthError::Unknown(msg) if msg.contains("auth/something-new")),
            "got {err:?}"
        );
        assert!(!err.is_transient());
    }
}
