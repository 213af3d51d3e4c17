//! Line-delimited JSON IPC surface of the attendance sidecar.

mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_request;
pub use types::{AppState, Request};
