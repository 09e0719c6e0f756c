//! Error types for the session layer.

/// Errors returned by the [`SessionManager`](crate::SessionManager) handle
/// itself, as opposed to the provider errors surfaced by `login`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The manager's task has stopped, either through
    /// [`shutdown`](crate::SessionManager::shutdown) or because the runtime
    /// it was started on went away. No further commands will be processed.
    #[error("session manager has stopped")]
    Stopped,
}
