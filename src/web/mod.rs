//! Web surface: REST room management, stats, and the WebSocket transport.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod ws;

pub use handlers::AppState;
pub use router::create_router;
pub use server::serve;
