//! Cell formatting shared by both renderers.
//!
//! Numeric values are rendered at zero decimal places with their unit
//! so the card and the mail table line up; a check with no backing
//! data is always the explicit `N/A` marker behind the white dot,
//! never a blank or a zero.

use rdsmon_audit::check_status;
use rdsmon_common::types::{CheckKind, CheckStatus, Finding, InstanceSnapshot};

/// Marker used when a field cannot be rendered at all.
pub const UNAVAILABLE: &str = "unavailable";

/// Status indicator glyph: green healthy, yellow warn, red alert,
/// white for no data.
pub fn status_dot(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Ok => "\u{1F7E2}",
        CheckStatus::Warn => "\u{1F7E1}",
        CheckStatus::Alert => "\u{1F534}",
        CheckStatus::NoData => "\u{26AA}",
    }
}

pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}%"),
        None => "N/A".to_string(),
    }
}

pub fn fmt_ms(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0} ms"),
        None => "N/A".to_string(),
    }
}

pub fn fmt_count(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}"),
        None => "N/A".to_string(),
    }
}

/// Fall back to the explicit unavailable marker for blank fields
/// instead of rendering an empty cell.
pub fn text_or_unavailable(text: &str) -> &str {
    if text.trim().is_empty() {
        UNAVAILABLE
    } else {
        text
    }
}

/// Deep link into the RDS console for one instance.
pub fn console_url(region: &str, instance_id: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/rds/home?region={region}#database:id={instance_id}"
    )
}

/// Render one check cell: status dot plus the observed value.
pub fn cell_text(snapshot: &InstanceSnapshot, findings: &[Finding], check: CheckKind) -> String {
    let status = check_status(snapshot, findings, check);
    let dot = status_dot(status);

    let value = match check {
        CheckKind::PublicAccess => {
            if snapshot.publicly_accessible { "Yes" } else { "No" }.to_string()
        }
        CheckKind::Encryption => enabled_text(snapshot.encrypted),
        CheckKind::PendingMaintenance => {
            if !snapshot.pending_maintenance {
                "None".to_string()
            } else if snapshot.pending_actions.is_empty() {
                "Yes".to_string()
            } else {
                snapshot.pending_actions.join(", ")
            }
        }
        CheckKind::Autoscaling => enabled_text(snapshot.autoscaling_enabled),
        CheckKind::MultiAz => enabled_text(snapshot.multi_az),
        CheckKind::Backup => match snapshot.backup_retention_days {
            Some(days) => format!("{days} d"),
            None => "N/A".to_string(),
        },
        CheckKind::Cpu | CheckKind::FreeStorage => fmt_pct(visible_metric(snapshot, check, status)),
        CheckKind::ReadLatency | CheckKind::WriteLatency => {
            fmt_ms(visible_metric(snapshot, check, status))
        }
        CheckKind::Connections => fmt_count(visible_metric(snapshot, check, status)),
    };

    format!("{dot} {value}")
}

/// The value to print for a numeric cell. A no-data status hides any
/// raw out-of-domain value behind `N/A`.
fn visible_metric(
    snapshot: &InstanceSnapshot,
    check: CheckKind,
    status: CheckStatus,
) -> Option<f64> {
    if status == CheckStatus::NoData {
        return None;
    }
    snapshot.metric_for(check)
}

fn enabled_text(enabled: bool) -> String {
    if enabled { "Enabled" } else { "Disabled" }.to_string()
}
