use rdsmon_common::types::{
    CheckKind, CheckStatus, Finding, InstanceSnapshot, Observation, Severity,
};
use rdsmon_config::{ThresholdPair, Thresholds};

/// Which side of a threshold pair is the unhealthy one.
#[derive(Debug, Clone, Copy)]
enum Direction {
    HigherIsWorse,
    LowerIsWorse,
}

impl Direction {
    /// Grade a value against its pair. Equality counts as crossing:
    /// the boundary is inclusive on the bad side. Returns the severity
    /// and the threshold that was crossed.
    fn grade(self, value: f64, pair: ThresholdPair) -> Option<(Severity, f64)> {
        match self {
            Direction::HigherIsWorse => {
                if value >= pair.alert {
                    Some((Severity::Alert, pair.alert))
                } else if value >= pair.warn {
                    Some((Severity::Warn, pair.warn))
                } else {
                    None
                }
            }
            Direction::LowerIsWorse => {
                if value <= pair.alert {
                    Some((Severity::Alert, pair.alert))
                } else if value <= pair.warn {
                    Some((Severity::Warn, pair.warn))
                } else {
                    None
                }
            }
        }
    }
}

/// Evaluate one snapshot against the run thresholds.
///
/// Findings come back in [`CheckKind::ALL`] order, at most one per
/// check. Healthy checks produce nothing, and a missing or
/// out-of-domain metric is skipped rather than graded — absence of data
/// never counts as healthy or unhealthy.
pub fn evaluate(snapshot: &InstanceSnapshot, thresholds: &Thresholds) -> Vec<Finding> {
    CheckKind::ALL
        .iter()
        .filter_map(|check| evaluate_check(snapshot, thresholds, *check))
        .collect()
}

fn evaluate_check(
    snapshot: &InstanceSnapshot,
    thresholds: &Thresholds,
    check: CheckKind,
) -> Option<Finding> {
    match check {
        CheckKind::PublicAccess => flag_finding(
            snapshot,
            check,
            snapshot.publicly_accessible,
            Severity::Alert,
            "publicly accessible",
        ),
        CheckKind::Encryption => flag_finding(
            snapshot,
            check,
            !snapshot.encrypted,
            Severity::Alert,
            "storage encryption disabled",
        ),
        CheckKind::PendingMaintenance => {
            if !snapshot.pending_maintenance {
                return None;
            }
            let detail = if snapshot.pending_actions.is_empty() {
                "maintenance pending".to_string()
            } else {
                format!("maintenance pending: {}", snapshot.pending_actions.join(", "))
            };
            Some(Finding {
                instance_id: snapshot.instance_id.clone(),
                check,
                severity: Severity::Warn,
                observation: Observation::Flag { detail },
            })
        }
        CheckKind::Autoscaling => flag_finding(
            snapshot,
            check,
            !snapshot.autoscaling_enabled,
            Severity::Warn,
            "storage autoscaling disabled",
        ),
        CheckKind::MultiAz => flag_finding(
            snapshot,
            check,
            !snapshot.multi_az,
            Severity::Warn,
            "single-AZ deployment",
        ),
        // Binary presence check: retention of zero days means automated
        // backups are off. Unknown retention is skipped, not graded.
        CheckKind::Backup => match snapshot.backup_retention_days {
            Some(0) => flag_finding(
                snapshot,
                check,
                true,
                Severity::Alert,
                "automated backups disabled (retention 0 days)",
            ),
            _ => None,
        },
        CheckKind::Cpu => numeric_finding(
            snapshot,
            check,
            thresholds.cpu_pct,
            Direction::HigherIsWorse,
        ),
        CheckKind::FreeStorage => numeric_finding(
            snapshot,
            check,
            thresholds.free_storage_pct,
            Direction::LowerIsWorse,
        ),
        CheckKind::ReadLatency => numeric_finding(
            snapshot,
            check,
            thresholds.read_latency_ms,
            Direction::HigherIsWorse,
        ),
        CheckKind::WriteLatency => numeric_finding(
            snapshot,
            check,
            thresholds.write_latency_ms,
            Direction::HigherIsWorse,
        ),
        // No threshold pair is configured for connection counts; the
        // value is display-only and never graded.
        CheckKind::Connections => None,
    }
}

fn flag_finding(
    snapshot: &InstanceSnapshot,
    check: CheckKind,
    is_bad: bool,
    severity: Severity,
    detail: &str,
) -> Option<Finding> {
    if !is_bad {
        return None;
    }
    Some(Finding {
        instance_id: snapshot.instance_id.clone(),
        check,
        severity,
        observation: Observation::Flag {
            detail: detail.to_string(),
        },
    })
}

fn numeric_finding(
    snapshot: &InstanceSnapshot,
    check: CheckKind,
    pair: ThresholdPair,
    direction: Direction,
) -> Option<Finding> {
    let value = usable_metric(snapshot, check)?;
    let (severity, threshold) = direction.grade(value, pair)?;
    Some(Finding {
        instance_id: snapshot.instance_id.clone(),
        check,
        severity,
        observation: Observation::Metric { value, threshold },
    })
}

/// The metric backing a check, filtered to its valid domain. A value
/// outside the domain (negative latency, percentage beyond 0-100, NaN)
/// is reported as unusable: the check is skipped and a diagnostic is
/// logged, never a finding.
fn usable_metric(snapshot: &InstanceSnapshot, check: CheckKind) -> Option<f64> {
    let value = snapshot.metric_for(check)?;
    let in_domain = match check {
        CheckKind::Cpu | CheckKind::FreeStorage => (0.0..=100.0).contains(&value),
        CheckKind::ReadLatency | CheckKind::WriteLatency | CheckKind::Connections => {
            value.is_finite() && value >= 0.0
        }
        _ => true,
    };
    if !in_domain {
        tracing::debug!(
            instance_id = %snapshot.instance_id,
            check = %check,
            value,
            "metric value outside expected domain, treating as unknown"
        );
        return None;
    }
    Some(value)
}

/// Four-way render state for one check on one instance.
///
/// Findings win; otherwise a check whose backing value is absent (or
/// out of domain) is `NoData`, and everything else is `Ok`. Renderers
/// use this to show flagged rows with their healthy columns neutral
/// and their unknown columns explicitly marked.
pub fn check_status(
    snapshot: &InstanceSnapshot,
    findings: &[Finding],
    check: CheckKind,
) -> CheckStatus {
    if let Some(finding) = findings.iter().find(|f| f.check == check) {
        return match finding.severity {
            Severity::Warn => CheckStatus::Warn,
            Severity::Alert => CheckStatus::Alert,
        };
    }
    let has_data = match check {
        CheckKind::Cpu
        | CheckKind::FreeStorage
        | CheckKind::ReadLatency
        | CheckKind::WriteLatency
        | CheckKind::Connections => usable_metric(snapshot, check).is_some(),
        CheckKind::Backup => snapshot.backup_retention_days.is_some(),
        _ => true,
    };
    if has_data {
        CheckStatus::Ok
    } else {
        CheckStatus::NoData
    }
}
