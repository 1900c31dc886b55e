//! Shoplink core contracts and value types.
//!
//! This crate exposes the data structures exchanged between the webhook
//! gateway, the catalog client, and the Messenger sender: the inbound
//! callback envelope, the typed action payload carried by postbacks and
//! quick replies, and the outbound message model with its Send API wire
//! shape.
pub mod action;
pub mod outbound;
pub mod webhook;

pub use action::*;
pub use outbound::*;
pub use webhook::*;

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(shoplink_core::version(), "0.1.0");
/// ```
pub fn version() -> &'static str {
    "0.1.0"
}
