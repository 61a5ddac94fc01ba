//! Multi-runtime script orchestration.
//!
//! Resolution ([`sources`]), command construction ([`command`] plus one
//! builder per runtime: [`shell`], [`node`], [`deno`]), temporary resource
//! ownership ([`temp_files`]) and process supervision ([`orchestrator`],
//! [`subprocess`]). Events flow out through [`channel::OutputChannel`].

pub mod channel;
pub mod command;
pub mod config;
pub mod deno;
pub mod events;
pub mod node;
pub mod orchestrator;
pub mod shell;
pub mod sources;
pub mod status;
pub mod subprocess;
pub mod temp_files;
pub mod usage;
