//! vmixlink data server
//!
//! Serves profile data to vMix pollers over HTTP, accepts item edits from the
//! management UI and pushes change deltas to WebSocket subscribers.

pub mod commands;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;

pub use commands::{Command, CommandClient, CommandReply};
pub use error::{ApiError, ApiResult, ServerError};
pub use notifier::ChangeNotifier;
pub use server::ApiServer;
pub use service::{ProfileService, RenderedProfile};
pub use state::AppState;
