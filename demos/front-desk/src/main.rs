//! Front desk demo: walks a receptionist's tablet through a day of sessions.
//!
//! Run it twice: on the second launch the cached session is restored at
//! once, then dropped when the provider reports that nobody is signed in.
//!
//! ```text
//! RUST_LOG=info cargo run -p front-desk
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tranquil::prelude::*;
use tracing::info;

const EMAIL: &str = "reception@tranquil.spa";
const PASSWORD: &str = "lavender-42";
const IDLE_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Where the tablet keeps its session record between launches.
fn session_path() -> PathBuf {
    std::env::var_os("FRONT_DESK_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("front-desk"))
        .join("session.json")
}

/// The provider knows one staff account. It is slow to report who is
/// signed in, so a cached session gets a moment to shine.
fn provider() -> MemoryIdentityProvider {
    let provider = MemoryIdentityProvider::with_deferred_initial_push();
    provider.register(EMAIL, PASSWORD);
    provider
}

fn describe(session: Option<&Session>) -> String {
    match session {
        Some(s) => format!("{} ({})", s.email(), s.source),
        None => "nobody".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), TranquilError> {
    tranquil::telemetry::init();

    let path = session_path();
    let provider = provider();
    let manager = SessionManager::builder()
        .inactivity_timeout(IDLE_TIMEOUT)
        .start(FileStore::new(&path), provider.clone());

    let screen = manager.subscribe(|session| {
        info!(signed_in = %describe(session), "screen updated");
    });

    // Give the cache a head start, then let the provider speak.
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!(state = %manager.state(), path = %path.display(), "after cache read");
    provider.announce();

    let state = manager.wait_until_resolved().await?;
    info!(%state, "startup resolved");

    // The provider had nobody signed in, so any cached session is gone by now.
    if manager.current_session().is_none() {
        if let Err(e) = manager.login(Credentials::new(EMAIL, "wrong")).await {
            info!(error = %e, "typo at the login screen");
        }
        let session = manager.login(Credentials::new(EMAIL, PASSWORD)).await?;
        info!(user = %session.identity.id, "receptionist signed in");
    }

    // Booking appointments: every tap keeps the session alive.
    for booking in 1..=3 {
        tokio::time::sleep(IDLE_TIMEOUT / 2).await;
        manager.record_activity();
        info!(booking, "appointment booked");
    }

    // Lunch break: the tablet sits idle.
    tokio::time::sleep(IDLE_TIMEOUT + Duration::from_millis(500)).await;
    info!(
        state = %manager.state(),
        reason = ?manager.last_logout(),
        "back from lunch"
    );

    // Sign back in and leave the session cached for the next launch.
    manager.login(Credentials::new(EMAIL, PASSWORD)).await?;
    info!(signed_in = %describe(manager.current_session().as_ref()), "ready for the afternoon");

    screen.unsubscribe();
    manager.shutdown().await?;
    Ok(())
}
