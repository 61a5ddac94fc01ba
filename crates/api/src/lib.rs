//! scriptsui API server library.
//!
//! Exposes the server building blocks (config, state, error handling,
//! routes, WebSocket transport) so integration tests and the binary
//! entrypoint can both access them.

pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod sources;
pub mod state;
pub mod ws;
