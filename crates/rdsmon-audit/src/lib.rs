//! Health-evaluation engine for database instance snapshots.
//!
//! [`evaluate`] turns one snapshot plus the run's thresholds into an
//! ordered list of findings; [`aggregate`] combines the per-instance
//! results into a single [`rdsmon_common::types::AuditReport`], keeping
//! only instances with at least one finding. Both are pure with respect
//! to their inputs: evaluating the same snapshot twice yields the same
//! findings, and instances can be evaluated in any order (or
//! concurrently) without affecting the result.

pub mod aggregator;
pub mod evaluator;


pub use aggregator::aggregate;
pub use evaluator::{check_status, evaluate};
