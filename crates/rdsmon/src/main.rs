use anyhow::{Context, Result};
use rdsmon_audit::{aggregate, evaluate};
use rdsmon_cloud::aws::AwsSource;
use rdsmon_cloud::{IdentitySource, MetricSource};
use rdsmon_common::types::AuditReport;
use rdsmon_config::{EmailSettings, Settings};
use rdsmon_notify::{email_report, teams_card, EmailChannel, TeamsChannel};
use tracing_subscriber::EnvFilter;

/// Fallback when `RUST_LOG` is unset. No target prefix: diagnostics
/// from the library crates must pass the filter too.
const DEFAULT_LOG_DIRECTIVES: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES)),
        )
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;
    tracing::info!(
        region = %settings.region,
        mail_report = settings.email.is_sendable(),
        "rdsmon starting"
    );

    let source = AwsSource::from_env(
        &settings.region,
        settings.metric_lookback_min,
        settings.metric_period_sec,
    )?;

    let account_label = source.resolve_account_label().await.unwrap_or_else(|| {
        tracing::warn!("could not resolve an account label, using placeholder");
        "unknown account".to_string()
    });

    let snapshots = source
        .list_instances()
        .await
        .context("listing database instances")?;

    let evaluated = snapshots
        .into_iter()
        .map(|snapshot| {
            let findings = evaluate(&snapshot, &settings.thresholds);
            (snapshot, findings)
        })
        .collect();
    let report = aggregate(&account_label, &settings.region, evaluated);
    tracing::info!(
        scanned = report.total_instances_scanned,
        flagged = report.rows.len(),
        "audit complete"
    );

    deliver(&settings, &report).await;
    Ok(())
}

/// Send the rendered report to every configured channel. Both sends are
/// attempted regardless of each other's outcome, and a delivery failure
/// is logged without failing the run: the audit itself completed.
async fn deliver(settings: &Settings, report: &AuditReport) {
    let card = teams_card::render(report);
    match TeamsChannel::new(&settings.webhook_url).send(&card).await {
        Ok(()) => tracing::info!("Teams card sent"),
        Err(e) => tracing::error!(error = %e, "Teams delivery failed"),
    }

    if settings.email.is_sendable() {
        match send_mail_report(&settings.email, report).await {
            Ok(()) => tracing::info!(recipients = settings.email.to.len(), "report mail sent"),
            Err(e) => tracing::error!(error = %e, "mail delivery failed"),
        }
    } else if settings.email.enabled {
        tracing::warn!("mail report enabled but sender, recipients or SMTP host missing, skipping");
    }
}

async fn send_mail_report(email: &EmailSettings, report: &AuditReport) -> Result<()> {
    let mut payload = email_report::render(report);
    if let Some(subject) = &email.subject {
        payload.subject = subject.clone();
    }

    let from = email.from.as_deref().context("MAIL_FROM not set")?;
    let host = email.smtp_host.as_deref().context("SMTP_HOST not set")?;
    let channel = EmailChannel::new(
        host,
        email.smtp_port,
        email.smtp_username.as_deref(),
        email.smtp_password.as_deref(),
        from,
    )?;
    channel
        .send(&payload, &email.to, &email.cc, &email.bcc)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rdsmon_common::types::InstanceSnapshot;
    use rdsmon_config::Thresholds;
    use std::collections::HashMap;

    struct FixedSource(Vec<InstanceSnapshot>);

    #[async_trait]
    impl MetricSource for FixedSource {
        async fn list_instances(&self) -> rdsmon_cloud::error::Result<Vec<InstanceSnapshot>> {
            Ok(self.0.clone())
        }
    }

    fn snapshot(id: &str, cpu_pct: f64, publicly_accessible: bool) -> InstanceSnapshot {
        InstanceSnapshot {
            instance_id: id.to_string(),
            name_tag: None,
            engine: "mysql".to_string(),
            publicly_accessible,
            encrypted: true,
            multi_az: true,
            autoscaling_enabled: true,
            pending_maintenance: false,
            pending_actions: Vec::new(),
            backup_retention_days: Some(7),
            cpu_pct: Some(cpu_pct),
            free_storage_pct: Some(80.0),
            read_latency_ms: Some(2.0),
            write_latency_ms: Some(2.0),
            active_connections: Some(40.0),
        }
    }

    #[tokio::test]
    async fn pipeline_turns_snapshots_into_renderable_payloads() {
        let source = FixedSource(vec![
            snapshot("db-hot", 95.0, true),
            snapshot("db-fine", 20.0, false),
        ]);
        let thresholds = Thresholds::default();

        let snapshots = source.list_instances().await.unwrap();
        let evaluated = snapshots
            .into_iter()
            .map(|s| {
                let findings = evaluate(&s, &thresholds);
                (s, findings)
            })
            .collect();
        let report = aggregate("acct", "us-east-1", evaluated);

        assert_eq!(report.total_instances_scanned, 2);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].snapshot.instance_id, "db-hot");

        let card = teams_card::render(&report);
        assert_eq!(card["type"], "message");

        let mail = email_report::render(&report);
        assert!(mail.html.contains("db-hot"));
        assert!(!mail.html.contains("db-fine"));
    }

    #[tokio::test]
    async fn delivery_failure_does_not_abort_the_run() {
        // Unreachable webhook: the send errors, deliver logs it and
        // returns normally so the process still exits zero.
        let env = HashMap::from([(
            "TEAMS_WEBHOOK".to_string(),
            "http://127.0.0.1:9/hook".to_string(),
        )]);
        let settings = Settings::from_map(&env).unwrap();
        let report = aggregate("acct", "us-east-1", Vec::new());

        deliver(&settings, &report).await;
    }

    #[test]
    fn fallback_log_filter_covers_library_targets() {
        // A target-prefixed directive would silence rdsmon_cloud and
        // rdsmon_notify diagnostics when RUST_LOG is unset.
        assert!(!DEFAULT_LOG_DIRECTIVES.contains('='));
    }
}
