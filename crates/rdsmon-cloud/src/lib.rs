//! External collaborators: where instance snapshots come from.
//!
//! The audit core only consumes already-fetched
//! [`rdsmon_common::types::InstanceSnapshot`]s; everything network-facing
//! lives behind the two traits here. [`aws::AwsSource`] implements both
//! against the RDS / CloudWatch / STS Query APIs.

pub mod aws;
pub mod error;

use async_trait::async_trait;
use rdsmon_common::types::InstanceSnapshot;

pub use error::SourceError;

/// Supplies one snapshot per database instance in the audited region.
///
/// An empty vec is a valid zero-instance run, not an error;
/// [`SourceError`] means the account/region could not be queried and the
/// run should be abandoned.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn list_instances(&self) -> error::Result<Vec<InstanceSnapshot>>;
}

/// Resolves a human-readable label for the audited account.
///
/// Best-effort: `None` on any failure, and the caller substitutes a
/// placeholder rather than failing the run.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn resolve_account_label(&self) -> Option<String>;
}
