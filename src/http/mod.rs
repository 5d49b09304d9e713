//! HTTP API server for external control (the display/UI layer boundary)
//!
//! This module provides a REST API for controlling the conversation session:
//! - POST /conversation/start - Start a conversation
//! - POST /conversation/stop - Stop the active conversation
//! - GET /conversation/status - Query session status
//! - GET /conversation/transcript - Get the finalized transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
