use thiserror::Error;

/// Session-level failure taxonomy.
///
/// `Clone` because a single refresh outcome is delivered to every request
/// queued behind the same refresh cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Session expired - please sign in again")]
    SessionExpired,

    #[error("Not signed in")]
    NoSession,

    #[error("Timed out waiting for the session to refresh")]
    RefreshTimedOut,
}
