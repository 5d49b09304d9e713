use crate::config::Config;
use crate::session::ConversationSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
///
/// At most one conversation session exists process-wide; starting a new
/// one requires the previous one to be fully stopped.
#[derive(Clone)]
pub struct AppState {
    /// The active (or last) conversation session
    pub session: Arc<RwLock<Option<Arc<ConversationSession>>>>,

    /// Loaded service configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            config: Arc::new(config),
        }
    }
}
