//! HTTP surface: page rendering, predict and report actions.
//!
//! `build_router()` returns a `Router` that serves every path. GET requests
//! go through `routing::route`; the two POST actions are mounted per disease
//! slug. Everything needed to render a page travels in the request.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::build_router;
pub use server::{start_server, PredictServer, ServerSession};
pub use types::AppContext;
