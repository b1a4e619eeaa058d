//! Pravo-MCP: the streamed tool-call protocol endpoint.
//!
//! One bidirectional surface: JSON-RPC 2.0 requests arrive over HTTP POST,
//! responses stream back as Server-Sent Events. Every orchestrator tool is
//! exposed through `tools/call`; discovery (`initialize`, `ping`) is open,
//! everything else requires a bearer token or an API key.

mod auth;
mod protocol;
mod server;

pub use auth::*;
pub use protocol::*;
pub use server::*;
