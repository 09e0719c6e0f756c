//! Unified error type for Tranquil.

use tranquil_identity::{AuthError, ProviderError};
use tranquil_session::SessionError;
use tranquil_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tranquil` facade, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant auto-generates `From` impls, so the `?` operator
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TranquilError {
    /// A classified sign-in, sign-up, or password reset failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A raw provider error that was not classified.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A session cache error (read, write, decode).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session manager itself failed (stopped).
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl TranquilError {
    /// Whether retrying the same operation later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_transient(),
            Self::Provider(e) => AuthError::from(e.clone()).is_transient(),
            Self::Store(StoreError::Io(_) | StoreError::Unavailable(_)) => true,
            Self::Store(_) | Self::Session(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use tranquil_identity::codes;

    use super::*;

    #[test]
    fn test_from_auth_error() {
        let err = AuthError::InvalidCredentials;
        let tranquil_err: TranquilError = err.into();
        assert!(matches!(tranquil_err, TranquilError::Auth(_)));
        assert_eq!(tranquil_err.to_string(), "invalid credentials");
    }

    #[test]
    fn test_from_provider_error() {
        let err = ProviderError::new(codes::NETWORK_REQUEST_FAILED, "offline");
        let tranquil_err: TranquilError = err.into();
        assert!(matches!(tranquil_err, TranquilError::Provider(_)));
        assert!(tranquil_err.to_string().contains("offline"));
        assert!(tranquil_err.is_transient());
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("locked".into());
        let tranquil_err: TranquilError = err.into();
        assert!(matches!(tranquil_err, TranquilError::Store(_)));
        assert!(tranquil_err.is_transient());
    }

    #[test]
    fn test_from_session_error() {
        let tranquil_err: TranquilError = SessionError::Stopped.into();
        assert!(matches!(tranquil_err, TranquilError::Session(_)));
        assert!(!tranquil_err.is_transient());
    }

    #[test]
    fn test_question_mark_converts() {
        fn login_like() -> Result<(), TranquilError> {
            let result: Result<(), AuthError> = Err(AuthError::AccountNotFound);
            result?;
            Ok(())
        }
        assert!(matches!(
            login_like(),
            Err(TranquilError::Auth(AuthError::AccountNotFound))
        ));
    }
}
