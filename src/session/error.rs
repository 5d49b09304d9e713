//! Error kinds surfaced by a conversation session
//!
//! Every failure ends in a fully-torn-down Idle/Error state; none of these
//! trigger automatic retry.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Credential absent at start; non-retryable until configured
    #[error("API key is not set. Please set the {0} environment variable.")]
    CredentialMissing(&'static str),

    /// Microphone acquisition refused or failed; user must retry manually
    #[error("Microphone access was denied. Please allow microphone access and try again.")]
    PermissionDenied(String),

    /// Transport could not establish the session
    #[error("Could not connect to the conversation service.")]
    ConnectFailure(String),

    /// Mid-session transport failure
    #[error("A connection error occurred.")]
    TransportError(String),

    /// Policy-driven voluntary termination, not a hard failure
    #[error("Conversation ended automatically due to inactivity.")]
    InactivityTimeout,
}
