//! HTTP API server for external control (the interview UI)
//!
//! This module provides a REST API for driving interview sessions:
//! - POST /sessions - Load an interview and start a session
//! - GET /sessions/:id - Query session state and progress
//! - GET /sessions/:id/transcript - Current question's transcript
//! - POST /sessions/:id/record/start - Begin capturing an answer
//! - POST /sessions/:id/record/stop - Finalize capture and submit
//! - POST /sessions/:id/next - Manual advance (behavioral mode)
//! - DELETE /sessions/:id - Tear a session down
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionEntry};
