//! HTML report generation.
//!
//! This module turns the aggregator's counter table into a
//! [`ReportDocument`] and renders it as the HTML body of a report email.

use crate::models::{ReportDocument, ReportRow, ReportWindow};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::collections::HashMap;

/// Compile a report from the current counter table.
pub fn compile_report(counters: &HashMap<String, u64>, window: ReportWindow) -> ReportDocument {
    let mut rows: Vec<ReportRow> = counters
        .iter()
        .map(|(source_id, count)| ReportRow {
            source_id: source_id.clone(),
            count: *count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });

    ReportDocument { window, rows }
}

/// Render a report as an HTML fragment.
pub fn render_html(report: &ReportDocument) -> String {
    let mut output = String::new();

    output.push_str(&generate_intro(&report.window));
    output.push_str(&generate_table(&report.rows));

    output
}

/// Subject line for a scheduled report.
pub fn report_subject(now: &DateTime<FixedOffset>) -> String {
    format!("Experiment Report: {}", format_timestamp(now))
}

/// Subject line for the startup notice.
pub fn startup_subject(now: &DateTime<FixedOffset>) -> String {
    format!("Experiment Server Started: {}", format_timestamp(now))
}

/// Body of the startup notice.
pub const STARTUP_BODY: &str = "Server started";

fn format_timestamp(time: &DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn generate_intro(window: &ReportWindow) -> String {
    format!(
        "Hey,<br><br>Between {} and {} the following submissions were made:<br><br>",
        format_timestamp(&window.start),
        format_timestamp(&window.end)
    )
}

fn generate_table(rows: &[ReportRow]) -> String {
    let mut table = String::new();

    table.push_str("<table>\n");
    table.push_str("    <thead>\n");
    table.push_str("        <tr>\n");
    table.push_str("            <th>ID</th><th>Count</th>\n");
    table.push_str("        </tr>\n");
    table.push_str("    </thead>\n");
    table.push_str("    <tbody>\n");

    for row in rows {
        table.push_str(&format!(
            "        <tr><td>{}</td><td>{}</td></tr>\n",
            escape_html(&row.source_id),
            row.count
        ));
    }

    table.push_str("    </tbody>\n");
    table.push_str("</table>");

    table
}

/// Source ids come straight from client payloads.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    escaped
}
