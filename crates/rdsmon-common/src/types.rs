use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Finding severity, ordered from lowest to highest.
///
/// Healthy checks never materialize a finding, so there is no `Ok`
/// variant here; the four-way render state lives in [`CheckStatus`].
///
/// # Examples
///
/// ```
/// use rdsmon_common::types::Severity;
///
/// let sev: Severity = "alert".parse().unwrap();
/// assert_eq!(sev, Severity::Alert);
/// assert_eq!(sev.to_string(), "alert");
/// assert!(Severity::Alert > Severity::Warn);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Alert,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warn => write!(f, "warn"),
            Severity::Alert => write!(f, "alert"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Ok(Severity::Warn),
            "alert" | "critical" => Ok(Severity::Alert),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// One health check applied to every instance.
///
/// The declaration order is canonical: the evaluator emits findings in
/// this order and both renderers lay out their columns in this order,
/// so a report is deterministic for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    PublicAccess,
    Encryption,
    PendingMaintenance,
    Autoscaling,
    MultiAz,
    Backup,
    Cpu,
    FreeStorage,
    ReadLatency,
    WriteLatency,
    Connections,
}

impl CheckKind {
    /// All checks in canonical evaluation/column order.
    pub const ALL: [CheckKind; 11] = [
        CheckKind::PublicAccess,
        CheckKind::Encryption,
        CheckKind::PendingMaintenance,
        CheckKind::Autoscaling,
        CheckKind::MultiAz,
        CheckKind::Backup,
        CheckKind::Cpu,
        CheckKind::FreeStorage,
        CheckKind::ReadLatency,
        CheckKind::WriteLatency,
        CheckKind::Connections,
    ];

    /// Column header used by both renderers.
    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::PublicAccess => "Public",
            CheckKind::Encryption => "Encryption",
            CheckKind::PendingMaintenance => "Pending Maint",
            CheckKind::Autoscaling => "Autoscaling",
            CheckKind::MultiAz => "Multi-AZ",
            CheckKind::Backup => "Backups",
            CheckKind::Cpu => "CPU",
            CheckKind::FreeStorage => "Free space",
            CheckKind::ReadLatency => "Read latency",
            CheckKind::WriteLatency => "Write latency",
            CheckKind::Connections => "Connections",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-check render state. Distinct from [`Severity`]: a check with no
/// backing data is `NoData`, never conflated with `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warn,
    Alert,
    NoData,
}

/// What a finding observed: a numeric value against its configured
/// threshold, or a flag in its bad state with a short description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    Metric { value: f64, threshold: f64 },
    Flag { detail: String },
}

/// A detected deviation from a healthy threshold for one check on one
/// instance. At most one finding exists per (instance, check) pair;
/// healthy checks are suppressed by absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub instance_id: String,
    pub check: CheckKind,
    pub severity: Severity,
    pub observation: Observation,
}

/// Point-in-time read of one database instance for a single run.
///
/// Metric fields are `None` when the monitoring API had no datapoint;
/// absence is a distinct third state and is never folded into zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub instance_id: String,
    /// Value of the `Name` tag, when the instance carries one.
    pub name_tag: Option<String>,
    pub engine: String,
    pub publicly_accessible: bool,
    pub encrypted: bool,
    pub multi_az: bool,
    /// Storage autoscaling: true when max allocated storage exceeds the
    /// currently allocated storage.
    pub autoscaling_enabled: bool,
    pub pending_maintenance: bool,
    /// Names of the pending maintenance actions, for display.
    #[serde(default)]
    pub pending_actions: Vec<String>,
    /// Automated backup retention in days; `None` when unknown.
    pub backup_retention_days: Option<u32>,
    pub cpu_pct: Option<f64>,
    pub free_storage_pct: Option<f64>,
    pub read_latency_ms: Option<f64>,
    pub write_latency_ms: Option<f64>,
    pub active_connections: Option<f64>,
}

impl InstanceSnapshot {
    /// The raw metric value backing a numeric check, if any. Flag checks
    /// always have data and return `None` here.
    pub fn metric_for(&self, check: CheckKind) -> Option<f64> {
        match check {
            CheckKind::Cpu => self.cpu_pct,
            CheckKind::FreeStorage => self.free_storage_pct,
            CheckKind::ReadLatency => self.read_latency_ms,
            CheckKind::WriteLatency => self.write_latency_ms,
            CheckKind::Connections => self.active_connections,
            _ => None,
        }
    }
}

/// One reported instance: its snapshot plus every finding raised
/// against it. Rows with zero findings never reach a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRow {
    pub snapshot: InstanceSnapshot,
    pub findings: Vec<Finding>,
}

impl InstanceRow {
    /// Highest severity present on this row, `None` for a healthy row.
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// The aggregated, filtered result of one audit run. Sole artifact
/// handed to the renderers; discarded after delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub account_label: String,
    pub region: String,
    pub generated_at: DateTime<Utc>,
    /// Flagged instances, worst first. Empty when the fleet is healthy.
    pub rows: Vec<InstanceRow>,
    /// Instances examined this run, including healthy ones.
    pub total_instances_scanned: usize,
}

impl AuditReport {
    /// Report title shared by both channels.
    pub fn title(&self) -> String {
        format!("{} - RDS Dashboard (Issues)", self.account_label)
    }
}
