//! Script execution domain logic.
//!
//! Everything needed to turn "run this script with this configuration" into
//! a supervised subprocess whose output is streamed to an observer. Nothing
//! here knows about HTTP or WebSockets; transports plug in through
//! [`scripting::channel::OutputChannel`].

pub mod error;
pub mod scripting;
