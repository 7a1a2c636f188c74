//! Shared data model for the rdsmon audit pipeline.
//!
//! One audit run produces one [`types::AuditReport`]: per-instance
//! [`types::InstanceSnapshot`]s are evaluated into [`types::Finding`]s,
//! healthy instances are suppressed, and the report is handed to the
//! channel renderers. Nothing here persists across runs.

pub mod types;
