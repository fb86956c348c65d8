//! HTTP API for the browser or terminal chat client
//!
//! - POST /api/chat - Relay one turn (text or recorded audio)
//! - GET /health - Health check

mod handlers;
pub mod messages;
mod routes;
mod state;

pub use handlers::TURN_COMPLETION_HEADER;
pub use messages::{ChatRequest, ChatResponse, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
