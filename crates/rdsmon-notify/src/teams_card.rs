//! Teams Adaptive Card renderer.
//!
//! Pure transform: one [`AuditReport`] in, one card payload out. The
//! card is the `message` + attachment wrapper Teams incoming webhooks
//! expect, with one `ColumnSet` per flagged instance. An empty report
//! still renders a valid "all healthy" card so a run always has
//! something to deliver.

use crate::format::{cell_text, console_url, text_or_unavailable};
use rdsmon_common::types::{AuditReport, CheckKind, InstanceRow};
use serde_json::{json, Value};

const CARD_VERSION: &str = "1.4";
const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";

/// Relative column widths: instance column first, engine second, then
/// one per check in canonical order.
const DB_WIDTH: u8 = 6;
const CELL_WIDTH: u8 = 3;

pub fn render(report: &AuditReport) -> Value {
    let mut body = vec![
        json!({
            "type": "TextBlock",
            "text": report.title(),
            "weight": "Bolder",
            "size": "Medium"
        }),
        json!({
            "type": "TextBlock",
            "text": summary_line(report),
            "isSubtle": true,
            "size": "Small",
            "spacing": "Small"
        }),
    ];

    if report.rows.is_empty() {
        body.push(json!({
            "type": "TextBlock",
            "text": empty_text(report),
            "wrap": true
        }));
    } else {
        body.push(header_row());
        for row in &report.rows {
            body.push(instance_row(report, row));
        }
    }

    json!({
        "type": "message",
        "attachments": [{
            "contentType": "application/vnd.microsoft.card.adaptive",
            "content": {
                "$schema": CARD_SCHEMA,
                "type": "AdaptiveCard",
                "version": CARD_VERSION,
                "body": body
            }
        }]
    })
}

fn summary_line(report: &AuditReport) -> String {
    format!(
        "{} | {} instance(s) scanned, {} with issues | {}",
        report.region,
        report.total_instances_scanned,
        report.rows.len(),
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn empty_text(report: &AuditReport) -> String {
    if report.total_instances_scanned == 0 {
        format!("No database instances found in {}.", report.region)
    } else {
        format!(
            "All {} scanned instance(s) are within healthy thresholds.",
            report.total_instances_scanned
        )
    }
}

fn header_row() -> Value {
    let mut columns = vec![
        header_cell("DB", DB_WIDTH),
        header_cell("Engine", CELL_WIDTH),
    ];
    columns.extend(
        CheckKind::ALL
            .iter()
            .map(|check| header_cell(check.label(), CELL_WIDTH)),
    );
    json!({ "type": "ColumnSet", "columns": columns })
}

fn instance_row(report: &AuditReport, row: &InstanceRow) -> Value {
    let snapshot = &row.snapshot;
    let url = console_url(&report.region, &snapshot.instance_id);
    let mut db_text = format!("[{}]({url})", snapshot.instance_id);
    if let Some(name) = &snapshot.name_tag {
        db_text.push_str(&format!("\n[{name}]({url})"));
    }

    let mut columns = vec![
        cell(&db_text, DB_WIDTH, true),
        cell(
            text_or_unavailable(&snapshot.engine),
            CELL_WIDTH,
            false,
        ),
    ];
    columns.extend(CheckKind::ALL.iter().map(|check| {
        cell(&cell_text(snapshot, &row.findings, *check), CELL_WIDTH, false)
    }));

    json!({ "type": "ColumnSet", "columns": columns })
}

fn header_cell(text: &str, width: u8) -> Value {
    json!({
        "type": "Column",
        "width": width.to_string(),
        "items": [{
            "type": "TextBlock",
            "text": text,
            "weight": "Bolder",
            "size": "Small",
            "spacing": "Small",
            "maxLines": 1
        }]
    })
}

fn cell(text: &str, width: u8, wrap: bool) -> Value {
    json!({
        "type": "Column",
        "width": width.to_string(),
        "items": [{
            "type": "TextBlock",
            "text": text,
            "size": "Small",
            "spacing": "Small",
            "wrap": wrap,
            "maxLines": if wrap { 0 } else { 1 }
        }]
    })
}
