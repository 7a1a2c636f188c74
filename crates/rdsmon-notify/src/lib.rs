//! Report rendering and delivery.
//!
//! The two renderers ([`teams_card`], [`email_report`]) are pure
//! transforms from an [`rdsmon_common::types::AuditReport`] to a
//! channel payload; the channels under [`channels`] do the actual I/O.
//! The channels are independent: a webhook failure never blocks the
//! mail delivery and vice versa — the caller logs each outcome
//! separately.

pub mod channels;
pub mod email_report;
pub mod error;
pub mod format;
pub mod teams_card;

#[cfg(test)]
mod tests;

pub use channels::email::EmailChannel;
pub use channels::teams::TeamsChannel;
pub use email_report::EmailPayload;
pub use error::NotifyError;
