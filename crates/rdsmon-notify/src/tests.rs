use crate::{email_report, format, teams_card};
use rdsmon_audit::{aggregate, evaluate};
use rdsmon_common::types::{AuditReport, CheckKind, CheckStatus, InstanceSnapshot};
use rdsmon_config::Thresholds;
use serde_json::Value;

fn healthy(id: &str) -> InstanceSnapshot {
    InstanceSnapshot {
        instance_id: id.to_string(),
        name_tag: None,
        engine: "postgres".to_string(),
        publicly_accessible: false,
        encrypted: true,
        multi_az: true,
        autoscaling_enabled: true,
        pending_maintenance: false,
        pending_actions: Vec::new(),
        backup_retention_days: Some(7),
        cpu_pct: Some(10.0),
        free_storage_pct: Some(90.0),
        read_latency_ms: Some(5.0),
        write_latency_ms: Some(5.0),
        active_connections: Some(12.0),
    }
}

fn report_for(snapshots: Vec<InstanceSnapshot>) -> AuditReport {
    let thresholds = Thresholds::default();
    let evaluated = snapshots
        .into_iter()
        .map(|s| {
            let findings = evaluate(&s, &thresholds);
            (s, findings)
        })
        .collect();
    aggregate("prod-account", "eu-west-1", evaluated)
}

fn card_body(card: &Value) -> &Vec<Value> {
    card.pointer("/attachments/0/content/body")
        .and_then(Value::as_array)
        .expect("card body")
}

fn column_texts(column_set: &Value) -> Vec<String> {
    column_set["columns"]
        .as_array()
        .expect("columns")
        .iter()
        .map(|col| {
            col.pointer("/items/0/text")
                .and_then(Value::as_str)
                .expect("cell text")
                .to_string()
        })
        .collect()
}

#[test]
fn card_wraps_adaptive_card_for_webhook() {
    let card = teams_card::render(&report_for(vec![healthy("db-1")]));
    assert_eq!(card["type"], "message");
    assert_eq!(
        card.pointer("/attachments/0/contentType").unwrap(),
        "application/vnd.microsoft.card.adaptive"
    );
    assert_eq!(
        card.pointer("/attachments/0/content/type").unwrap(),
        "AdaptiveCard"
    );
    assert_eq!(
        card_body(&card)[0]["text"],
        "prod-account - RDS Dashboard (Issues)"
    );
}

#[test]
fn card_with_no_instances_explains_the_empty_scan() {
    let card = teams_card::render(&report_for(Vec::new()));
    let body = card_body(&card).clone();
    assert_eq!(body.len(), 3);
    assert_eq!(
        body[2]["text"],
        "No database instances found in eu-west-1."
    );
}

#[test]
fn card_with_only_healthy_instances_says_so() {
    let card = teams_card::render(&report_for(vec![healthy("db-1"), healthy("db-2")]));
    let body = card_body(&card).clone();
    assert_eq!(
        body[2]["text"],
        "All 2 scanned instance(s) are within healthy thresholds."
    );
    assert!(body[1]["text"]
        .as_str()
        .unwrap()
        .contains("2 instance(s) scanned, 0 with issues"));
}

#[test]
fn flagged_instance_renders_one_column_per_check() {
    let mut snapshot = healthy("db-busy");
    snapshot.cpu_pct = Some(95.0);
    let card = teams_card::render(&report_for(vec![snapshot]));
    let body = card_body(&card).clone();

    // title, summary, header row, one instance row
    assert_eq!(body.len(), 4);
    let header = column_texts(&body[2]);
    assert_eq!(header.len(), 2 + CheckKind::ALL.len());
    assert_eq!(header[0], "DB");
    assert_eq!(header[1], "Engine");
    assert_eq!(header[2], "Public");

    let row = column_texts(&body[3]);
    assert_eq!(row.len(), header.len());
    assert!(row[0].contains("[db-busy]"));
    assert!(row[0].contains("eu-west-1.console.aws.amazon.com"));
    assert_eq!(row[1], "postgres");
}

#[test]
fn cpu_breach_gets_red_dot_and_value() {
    let mut snapshot = healthy("db-busy");
    snapshot.cpu_pct = Some(95.0);
    let card = teams_card::render(&report_for(vec![snapshot]));
    let row = column_texts(&card_body(&card)[3]);

    let cpu_col = 2 + CheckKind::ALL
        .iter()
        .position(|c| *c == CheckKind::Cpu)
        .unwrap();
    assert_eq!(row[cpu_col], "\u{1F534} 95%");

    let storage_col = 2 + CheckKind::ALL
        .iter()
        .position(|c| *c == CheckKind::FreeStorage)
        .unwrap();
    assert_eq!(row[storage_col], "\u{1F7E2} 90%");
}

#[test]
fn missing_metric_renders_white_dot_not_a_number() {
    let mut snapshot = healthy("db-quiet");
    snapshot.publicly_accessible = true;
    snapshot.read_latency_ms = None;
    snapshot.active_connections = Some(f64::NAN);
    let card = teams_card::render(&report_for(vec![snapshot]));
    let row = column_texts(&card_body(&card)[3]);

    let read_col = 2 + CheckKind::ALL
        .iter()
        .position(|c| *c == CheckKind::ReadLatency)
        .unwrap();
    assert_eq!(row[read_col], "\u{26AA} N/A");

    let conn_col = 2 + CheckKind::ALL
        .iter()
        .position(|c| *c == CheckKind::Connections)
        .unwrap();
    assert_eq!(row[conn_col], "\u{26AA} N/A");
}

#[test]
fn name_tag_appears_under_the_instance_link() {
    let mut snapshot = healthy("db-tagged");
    snapshot.publicly_accessible = true;
    snapshot.name_tag = Some("orders-primary".to_string());
    let card = teams_card::render(&report_for(vec![snapshot]));
    let row = column_texts(&card_body(&card)[3]);
    assert!(row[0].contains("[orders-primary]"));
}

#[test]
fn pending_actions_listed_in_maintenance_cell() {
    let mut snapshot = healthy("db-maint");
    snapshot.pending_maintenance = true;
    snapshot.pending_actions = vec!["os-upgrade".to_string(), "system-update".to_string()];
    let card = teams_card::render(&report_for(vec![snapshot]));
    let row = column_texts(&card_body(&card)[3]);

    let maint_col = 2 + CheckKind::ALL
        .iter()
        .position(|c| *c == CheckKind::PendingMaintenance)
        .unwrap();
    assert_eq!(row[maint_col], "\u{1F7E1} os-upgrade, system-update");
}

#[test]
fn email_subject_matches_report_title() {
    let report = report_for(vec![healthy("db-1")]);
    let payload = email_report::render(&report);
    assert_eq!(payload.subject, "prod-account - RDS Dashboard (Issues)");
}

#[test]
fn email_html_builds_a_full_table_for_flagged_rows() {
    let mut snapshot = healthy("db-busy");
    snapshot.cpu_pct = Some(95.0);
    let payload = email_report::render(&report_for(vec![snapshot]));

    assert!(payload.html.contains("<table>"));
    assert!(payload.html.contains("<th>DB</th>"));
    assert!(payload.html.contains("<th>Free space</th>"));
    assert!(payload.html.contains("class='right'"));
    assert!(payload
        .html
        .contains("https://eu-west-1.console.aws.amazon.com/rds/home?region=eu-west-1#database:id=db-busy"));
    assert!(payload.html.contains("\u{1F534} 95%"));
}

#[test]
fn email_text_alternative_carries_the_same_rows() {
    let mut snapshot = healthy("db-busy");
    snapshot.cpu_pct = Some(95.0);
    let payload = email_report::render(&report_for(vec![snapshot]));

    assert!(payload.text.contains("db-busy"));
    assert!(payload.text.contains("\u{1F534} 95%"));
    assert!(!payload.text.contains('<'));
}

#[test]
fn email_with_no_instances_explains_the_empty_scan() {
    let payload = email_report::render(&report_for(Vec::new()));
    assert!(!payload.html.contains("<table>"));
    assert!(payload
        .html
        .contains("No database instances found in eu-west-1."));
    assert!(payload
        .text
        .contains("No database instances found in eu-west-1."));
}

#[test]
fn email_for_clean_fleet_has_no_table() {
    let payload = email_report::render(&report_for(vec![healthy("db-1")]));
    assert!(!payload.html.contains("<table>"));
    assert!(payload
        .html
        .contains("All 1 scanned instance(s) are within healthy thresholds."));
}

#[test]
fn status_dots_cover_all_four_states() {
    assert_eq!(format::status_dot(CheckStatus::Ok), "\u{1F7E2}");
    assert_eq!(format::status_dot(CheckStatus::Warn), "\u{1F7E1}");
    assert_eq!(format::status_dot(CheckStatus::Alert), "\u{1F534}");
    assert_eq!(format::status_dot(CheckStatus::NoData), "\u{26AA}");
}

#[test]
fn blank_engine_renders_the_unavailable_marker() {
    assert_eq!(format::text_or_unavailable("  "), format::UNAVAILABLE);
    assert_eq!(format::text_or_unavailable("mysql"), "mysql");
}
