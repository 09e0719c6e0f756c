//! Facade-level tests: a real file-backed cache across app restarts.
//!
//! These run on the real clock because `tokio::fs` goes through the
//! blocking pool; every timeout involved is far longer than the test.

use std::path::Path;
use std::time::Duration;

use tranquil::prelude::*;

const EMAIL: &str = "a@x.com";
const PASSWORD: &str = "hunter22";

/// Polls `check` until it holds or a second has passed.
async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_file_store_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tranquil/session.json");
    let provider = MemoryIdentityProvider::new();
    let identity = provider.register(EMAIL, PASSWORD);

    let first = SessionManager::start(FileStore::new(&path), provider.clone());
    first.wait_until_resolved().await.unwrap();
    let session = first
        .login(Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    assert_eq!(session.identity, identity);
    first.shutdown().await.unwrap();

    let record = read_json(&path);
    assert_eq!(record["identity"]["email"], EMAIL);
    assert_eq!(record["identity"]["id"], identity.id.as_str());
    assert_eq!(record["schemaVersion"], 1);
    assert_eq!(record["issuedAt"], session.issued_at);

    // Next launch: the provider is slow to answer, the cache is not.
    let second = SessionManager::start(
        FileStore::new(&path),
        MemoryIdentityProvider::with_deferred_initial_push(),
    );
    let state = second.wait_until_resolved().await.unwrap();
    assert_eq!(state, SessionState::Authenticated);
    let restored = second.current_session().unwrap();
    assert_eq!(restored.identity, identity);
    assert_eq!(restored.source, SessionSource::RestoredFromCache);
    assert_eq!(restored.issued_at, session.issued_at);

    second.logout(LogoutReason::Manual).await;
    assert!(
        eventually(|| !path.exists()).await,
        "logout should delete the cached record"
    );
}

#[tokio::test]
async fn test_unsupported_schema_is_ignored_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(
        &path,
        br#"{"identity":{"id":"uid-1","email":"a@x.com"},"issuedAt":1,"schemaVersion":99}"#,
    )
    .unwrap();

    let manager = SessionManager::start(
        FileStore::new(&path),
        MemoryIdentityProvider::with_deferred_initial_push(),
    );

    assert!(eventually(|| !path.exists()).await);
    assert_eq!(manager.state(), SessionState::Restoring);
    assert_eq!(manager.current_session(), None);
}

#[tokio::test]
async fn test_errors_convert_into_tranquil_error() {
    async fn sign_in(manager: &SessionManager) -> Result<Session, TranquilError> {
        manager.wait_until_resolved().await?;
        let session = manager.login(Credentials::new(EMAIL, "wrong-one")).await?;
        Ok(session)
    }

    let provider = MemoryIdentityProvider::new();
    provider.register(EMAIL, PASSWORD);
    let manager = SessionManager::start(MemoryStore::new(), provider);

    let err = sign_in(&manager).await.unwrap_err();

    assert!(matches!(err, TranquilError::Auth(AuthError::InvalidCredentials)));
    assert!(!err.is_transient());
}
