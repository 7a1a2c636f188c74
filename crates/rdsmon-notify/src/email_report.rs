//! HTML e-mail renderer.
//!
//! Mirrors the card's columns as an inline-styled table with a
//! plain-text alternative. Pure: no I/O, and a field that cannot be
//! rendered degrades to an explicit marker instead of aborting the
//! report.

use crate::format::{cell_text, console_url, text_or_unavailable};
use rdsmon_common::types::{AuditReport, CheckKind, InstanceRow};

/// What the mail channel delivers: subject plus the two alternative
/// bodies.
#[derive(Debug, Clone)]
pub struct EmailPayload {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const TABLE_STYLE: &str = "<style>\n\
      table{border-collapse:collapse;width:100%;font:13px Arial}\n\
      th,td{border:1px solid #ddd;padding:6px 8px}\n\
      th{background:#f5f5f5;text-align:left}\n\
      .right{text-align:right}\n\
    </style>";

pub fn render(report: &AuditReport) -> EmailPayload {
    let title = report.title();
    let summary = format!(
        "{} | {} instance(s) scanned, {} with issues | {}",
        report.region,
        report.total_instances_scanned,
        report.rows.len(),
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    let (html_body, text_body) = if report.rows.is_empty() {
        let message = if report.total_instances_scanned == 0 {
            format!("No database instances found in {}.", report.region)
        } else {
            format!(
                "All {} scanned instance(s) are within healthy thresholds.",
                report.total_instances_scanned
            )
        };
        (format!("<p>{message}</p>"), message)
    } else {
        (html_table(report), text_rows(report))
    };

    EmailPayload {
        subject: title.clone(),
        html: format!(
            "<html><head>{TABLE_STYLE}</head><body><h3>{title}</h3><p>{summary}</p>{html_body}</body></html>"
        ),
        text: format!("{title}\n{summary}\n{text_body}"),
    }
}

fn html_table(report: &AuditReport) -> String {
    let mut headers = vec!["DB".to_string(), "Engine".to_string()];
    headers.extend(CheckKind::ALL.iter().map(|c| c.label().to_string()));
    let header_html: String = headers
        .iter()
        .map(|h| format!("<th>{h}</th>"))
        .collect();

    let rows_html: String = report
        .rows
        .iter()
        .map(|row| row_html(report, row))
        .collect();

    format!("<table><tr>{header_html}</tr>{rows_html}</table>")
}

fn row_html(report: &AuditReport, row: &InstanceRow) -> String {
    let snapshot = &row.snapshot;
    let url = console_url(&report.region, &snapshot.instance_id);
    let mut db_cell = format!("<a href='{url}'>{}</a>", snapshot.instance_id);
    if let Some(name) = &snapshot.name_tag {
        db_cell.push_str(&format!("<br/><a href='{url}'>{name}</a>"));
    }

    let mut cells = vec![
        format!("<td>{db_cell}</td>"),
        format!("<td>{}</td>", text_or_unavailable(&snapshot.engine)),
    ];
    cells.extend(CheckKind::ALL.iter().map(|check| {
        let class = if is_numeric(*check) { " class='right'" } else { "" };
        format!("<td{class}>{}</td>", cell_text(snapshot, &row.findings, *check))
    }));

    format!("<tr>{}</tr>", cells.concat())
}

fn text_rows(report: &AuditReport) -> String {
    report
        .rows
        .iter()
        .map(|row| {
            let snapshot = &row.snapshot;
            let mut parts = vec![
                snapshot.instance_id.clone(),
                text_or_unavailable(&snapshot.engine).to_string(),
            ];
            parts.extend(
                CheckKind::ALL
                    .iter()
                    .map(|check| cell_text(snapshot, &row.findings, *check)),
            );
            parts.join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_numeric(check: CheckKind) -> bool {
    matches!(
        check,
        CheckKind::Cpu
            | CheckKind::FreeStorage
            | CheckKind::ReadLatency
            | CheckKind::WriteLatency
            | CheckKind::Connections
    )
}
