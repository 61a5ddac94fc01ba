//! Outbound notifications about script runs.
//!
//! - [`delivery::webhook`]: the anonymous usage beacon that records the
//!   exit code of every run when the user has opted in.

pub mod delivery;

pub use delivery::webhook::{UsageWebhook, UsageWebhookConfig, WebhookError};
