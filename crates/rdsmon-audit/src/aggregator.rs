use chrono::Utc;
use rdsmon_common::types::{AuditReport, Finding, InstanceRow, InstanceSnapshot};

/// Combine per-instance evaluation results into one report.
///
/// Instances with zero findings are dropped; `total_instances_scanned`
/// still counts them. Surviving rows are ordered worst-first: highest
/// severity present, then instance id lexicographically, so the same
/// input always renders the same report.
pub fn aggregate(
    account_label: &str,
    region: &str,
    evaluated: Vec<(InstanceSnapshot, Vec<Finding>)>,
) -> AuditReport {
    let total_instances_scanned = evaluated.len();

    let mut rows: Vec<InstanceRow> = evaluated
        .into_iter()
        .filter(|(_, findings)| !findings.is_empty())
        .map(|(snapshot, findings)| InstanceRow { snapshot, findings })
        .collect();

    rows.sort_by(|a, b| {
        b.max_severity()
            .cmp(&a.max_severity())
            .then_with(|| a.snapshot.instance_id.cmp(&b.snapshot.instance_id))
    });

    AuditReport {
        account_label: account_label.to_string(),
        region: region.to_string(),
        generated_at: Utc::now(),
        rows,
        total_instances_scanned,
    }
}
