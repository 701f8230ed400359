use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{AnalysisReport, SeriesView};
use crate::config::ReportConfig;
use crate::error::GuardplotError;
use crate::log::lookup::{lookup, render_cell};

/// Column order of the flat transaction table.
pub const CSV_COLUMNS: [&str; 12] = [
    "sequence_number",
    "thread_id",
    "thread_sequence_number",
    "request_timestamp_ms",
    "response_timestamp_ms",
    "url",
    "handle_delay",
    "delay_ms",
    "current_req_per_min",
    "server_side_delay",
    "my_time_ms",
    "make_request_at_ms",
];

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export the transaction table as CSV, one row per transaction in global
/// sequence order.
///
/// Every column must resolve for every row; the first miss fails the whole
/// export with [`GuardplotError::MissingField`].
pub fn export_csv(report: &AnalysisReport) -> Result<String, GuardplotError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for (index, record) in report.table.iter().enumerate() {
        let row = CSV_COLUMNS
            .iter()
            .map(|&column| {
                lookup(record, column)
                    .map(render_cell)
                    .ok_or_else(|| GuardplotError::MissingField {
                        field: column.to_string(),
                        row: row_label(record, index),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| GuardplotError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| GuardplotError::Format(e.to_string()))
}

/// How a row is named in error messages: its sequence number when it has one.
fn row_label(record: &Value, index: usize) -> String {
    lookup(record, "sequence_number")
        .map(render_cell)
        .unwrap_or_else(|| format!("at index {index}"))
}

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Export the report as pretty-printed JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

// ---------------------------------------------------------------------------
// HTML export
// ---------------------------------------------------------------------------

/// Export the report as a standalone HTML page with inline CSS.
///
/// Charts are referenced as sibling SVG files named by
/// [`AnalysisReport::chart_files`];
/// they are omitted when `config.write_charts` is off.
pub fn export_html(report: &AnalysisReport, config: &ReportConfig) -> String {
    let generated = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let summary_rows: String = report
        .views()
        .map(summary_row)
        .collect::<Vec<_>>()
        .join("\n");

    let charts: String = if config.write_charts {
        report
            .chart_files()
            .into_iter()
            .map(|(view, file)| {
                format!(
                    "<figure><img src=\"{src}\" alt=\"{label}\">\
                     <figcaption>{label}</figcaption></figure>",
                    src = html_escape(&file),
                    label = html_escape(&view.label),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        String::new()
    };

    let skipped: String = if report.skipped.is_empty() {
        String::new()
    } else {
        let items = report
            .skipped
            .iter()
            .map(|s| {
                format!(
                    "<li><strong>{}</strong>: {}</li>",
                    html_escape(&s.label),
                    html_escape(&s.reason)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("<h2>Skipped Views</h2>\n<ul class=\"skipped\">\n{items}\n</ul>")
    };

    let transaction_rows: String = report
        .table
        .iter()
        .take(config.html_row_limit)
        .map(|record| {
            let cells = CSV_COLUMNS
                .iter()
                .map(|&column| {
                    let text = lookup(record, column)
                        .map(render_cell)
                        .unwrap_or_else(|| "—".to_string());
                    format!("<td>{}</td>", html_escape(&text))
                })
                .collect::<String>();
            format!("<tr>{cells}</tr>")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let transaction_header: String = CSV_COLUMNS
        .iter()
        .map(|c| format!("<th>{c}</th>"))
        .collect();

    let row_count = report.table.len();
    let transaction_caption = if row_count > config.html_row_limit {
        format!(
            "Showing first {} of {} transactions",
            config.html_row_limit, row_count
        )
    } else {
        format!("{row_count} transactions")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>guardplot Report — {source}</title>
<style>
  *, *::before, *::after {{ box-sizing: border-box; }}
  body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0; padding: 2rem;
    background: #0f172a; color: #e2e8f0;
    line-height: 1.5;
  }}
  h1 {{ font-size: 1.75rem; font-weight: 700; color: #f1f5f9; margin: 0 0 0.25rem; }}
  h2 {{ font-size: 1.125rem; font-weight: 600; color: #94a3b8;
        text-transform: uppercase; letter-spacing: 0.05em;
        margin: 2rem 0 0.75rem; border-bottom: 1px solid #1e293b; padding-bottom: 0.5rem; }}
  .meta {{ color: #64748b; font-size: 0.875rem; margin-bottom: 2rem; }}
  .meta span {{ margin-right: 1.5rem; }}
  table {{
    width: 100%; border-collapse: collapse; font-size: 0.8125rem;
    background: #1e293b; border-radius: 0.5rem; overflow: hidden;
    margin-bottom: 2rem;
  }}
  thead {{ background: #0f172a; }}
  th {{
    padding: 0.625rem 0.875rem; text-align: left;
    font-weight: 600; color: #94a3b8;
    text-transform: uppercase; letter-spacing: 0.04em;
    font-size: 0.75rem;
  }}
  td {{ padding: 0.5rem 0.875rem; border-top: 1px solid #334155; color: #cbd5e1; }}
  tr:hover td {{ background: #243352; }}
  caption {{
    text-align: left; padding: 0.5rem 0; color: #64748b;
    font-size: 0.8125rem; caption-side: bottom;
  }}
  .blue {{ color: #60a5fa; }}
  .red {{ color: #f87171; }}
  figure {{ margin: 0 0 2rem; background: #fff; border-radius: 0.5rem; padding: 0.5rem; }}
  figure img {{ width: 100%; display: block; }}
  figcaption {{ color: #334155; font-size: 0.8125rem; padding-top: 0.25rem; }}
  pre {{
    background: #1e293b; border: 1px solid #334155; border-radius: 0.5rem;
    padding: 1rem; overflow-x: auto; font-size: 0.8125rem; color: #cbd5e1;
  }}
  ul.skipped {{ color: #fbbf24; }}
  footer {{
    margin-top: 3rem; padding-top: 1rem; border-top: 1px solid #1e293b;
    color: #475569; font-size: 0.8125rem;
  }}
</style>
</head>
<body>
<h1>{source}</h1>
<div class="meta">
  <span>Format: {shape}</span>
  <span>Transactions: {transaction_count}</span>
  <span>Threads: {thread_count}</span>
</div>

<h2>Delay Summary</h2>
<table>
  <thead>
    <tr>
      <th>View</th><th>Mode</th><th>Count</th><th>Mean (ms)</th><th>Max (ms)</th>
      <th>&le; Mean</th><th>&gt; Mean</th><th>Ratio</th>
      <th>Max req/min</th><th>Mean req/min</th>
    </tr>
  </thead>
  <tbody>
{summary_rows}
  </tbody>
</table>
{skipped}

<h2>Charts</h2>
{charts}

<h2>API Guard Config</h2>
<pre>{server_config}</pre>

<h2>Client Config</h2>
<pre>{client_config}</pre>

<h2>Transactions</h2>
<table>
  <caption>{transaction_caption}</caption>
  <thead>
    <tr>{transaction_header}</tr>
  </thead>
  <tbody>
{transaction_rows}
  </tbody>
</table>

<footer>Generated by guardplot &bull; {generated}</footer>
</body>
</html>
"#,
        source = html_escape(&report.source_name),
        shape = report.shape,
        transaction_count = report.transaction_count,
        thread_count = report.threads.len(),
        summary_rows = summary_rows,
        skipped = skipped,
        charts = charts,
        server_config = html_escape(&pretty_json(&report.server_config)),
        client_config = html_escape(&pretty_json(&report.client_config)),
        transaction_caption = transaction_caption,
        transaction_header = transaction_header,
        transaction_rows = transaction_rows,
        generated = generated,
    )
}

fn summary_row(view: &SeriesView) -> String {
    let s = &view.summary;
    let (rate_max, rate_mean) = match s.rate {
        Some(rate) => (format!("{:.1}", rate.max), format!("{:.1}", rate.mean)),
        None => ("—".to_string(), "—".to_string()),
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td>\
         <td class=\"blue\">{}</td><td class=\"red\">{}</td><td>{:.2}</td>\
         <td>{}</td><td>{}</td></tr>",
        html_escape(&view.label),
        view.mode,
        s.count,
        s.mean_ms,
        s.max_ms,
        s.blue.len(),
        s.red.len(),
        s.ratio,
        rate_max,
        rate_mean,
    )
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
