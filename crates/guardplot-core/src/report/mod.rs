pub mod chart;
pub mod export;
pub mod io;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::delay::{delay_values, derive_delays, DelayMode, DelayPoint};
use crate::analysis::grouping::{group_by_thread, order_by_global_sequence, order_by_issue_time};
use crate::analysis::summary::{summarize, Summary};
use crate::error::GuardplotError;
use crate::log::model::{LogDocument, LogShape, Transaction};

/// Label of the view over all transactions in global sequence order.
pub const ALL_CLIENTS_LABEL: &str = "all_clients";
/// Label of the inter-arrival view over all transactions in issue-time order.
pub const ALL_DELAYS_LABEL: &str = "all_delays";

// ---------------------------------------------------------------------------
// SeriesView
// ---------------------------------------------------------------------------

/// Which slice of the log a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// One client thread, ordered by thread sequence number.
    Thread,
    /// Every transaction, ordered by global sequence number.
    AllClients,
    /// Every transaction, ordered by issue time.
    AllDelays,
}

/// A classified delay series, ready for charting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeriesView {
    pub label: String,
    pub kind: ViewKind,
    pub mode: DelayMode,
    /// X-axis position of each point.
    pub x: Vec<u64>,
    /// Global sequence number of the transaction behind each point.
    pub sequence_numbers: Vec<u64>,
    pub delays: Vec<DelayPoint>,
    /// Present only when every transaction in the view reports a rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates: Option<Vec<f64>>,
    pub summary: Summary,
}

/// A view that could not be summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SkippedView {
    pub label: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// AnalysisReport
// ---------------------------------------------------------------------------

/// Everything renderers and exporters need from one log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisReport {
    /// File name of the analysed log, e.g. `testloop.out.json`.
    pub source_name: String,
    /// Stem used to name every artefact, e.g. `testloop.out`.
    pub basename: String,
    pub shape: LogShape,
    pub transaction_count: usize,
    pub server_config: Value,
    pub client_config: Value,
    pub threads: Vec<SeriesView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_clients: Option<SeriesView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_delays: Option<SeriesView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedView>,
    /// Raw transaction records in global sequence order, for tabular export.
    #[serde(skip)]
    pub table: Vec<Value>,
}

impl AnalysisReport {
    /// All produced views: threads first, then the aggregate views.
    pub fn views(&self) -> impl Iterator<Item = &SeriesView> {
        self.threads
            .iter()
            .chain(self.all_clients.as_ref())
            .chain(self.all_delays.as_ref())
    }

    /// Every view paired with the file name of its chart.
    ///
    /// Names are unique within the report: when two thread ids sanitize to
    /// the same name, later ones get a `-2`, `-3`, ... suffix.
    pub fn chart_files(&self) -> Vec<(&SeriesView, String)> {
        let mut taken = HashSet::new();
        self.views()
            .map(|view| {
                let name = chart::chart_file_name(&self.basename, view);
                let mut unique = name.clone();
                let mut n = 2;
                while !taken.insert(unique.clone()) {
                    let stem = name.trim_end_matches(".svg");
                    unique = format!("{stem}-{n}.svg");
                    n += 1;
                }
                (view, unique)
            })
            .collect()
    }
}

/// Build the full report for `doc`.
///
/// `source_name` is the log's file name (or path) and is used only for
/// titles and artefact names. An [`GuardplotError::OrderingViolation`] in the
/// issue-time timeline aborts assembly; empty views are recorded in
/// [`AnalysisReport::skipped`] instead.
pub fn assemble_report(
    doc: &LogDocument,
    source_name: &str,
) -> Result<AnalysisReport, GuardplotError> {
    let mut skipped = Vec::new();

    let all_delays = if doc.transactions.iter().all(|t| t.request_issue_time_ms.is_some()) {
        let by_issue_time = order_by_issue_time(&doc.transactions)?;
        let x = (1..=by_issue_time.len() as u64).collect();
        keep_or_skip(
            build_view(ALL_DELAYS_LABEL, ViewKind::AllDelays, &by_issue_time, DelayMode::InterArrival, x),
            ALL_DELAYS_LABEL,
            &mut skipped,
        )?
    } else {
        tracing::warn!("log lacks request issue times; omitting the '{ALL_DELAYS_LABEL}' view");
        None
    };

    let mut threads = Vec::new();
    for (thread_id, group) in group_by_thread(&doc.transactions) {
        let x = group.iter().map(|t| t.thread_sequence_number).collect();
        let view = build_view(&thread_id, ViewKind::Thread, &group, DelayMode::Reported, x);
        if let Some(view) = keep_or_skip(view, &thread_id, &mut skipped)? {
            threads.push(view);
        }
    }

    let by_sequence = order_by_global_sequence(&doc.transactions);
    let x = by_sequence.iter().map(|t| t.global_sequence_number).collect();
    let all_clients = keep_or_skip(
        build_view(ALL_CLIENTS_LABEL, ViewKind::AllClients, &by_sequence, DelayMode::Reported, x),
        ALL_CLIENTS_LABEL,
        &mut skipped,
    )?;

    let table = by_sequence.iter().map(|t| t.raw.clone()).collect();

    tracing::debug!(
        threads = threads.len(),
        skipped = skipped.len(),
        "assembled report"
    );

    Ok(AnalysisReport {
        source_name: file_name_of(source_name),
        basename: basename_of(source_name),
        shape: doc.shape,
        transaction_count: doc.len(),
        server_config: doc.server_config.clone(),
        client_config: doc.client_config.clone(),
        threads,
        all_clients,
        all_delays,
        skipped,
        table,
    })
}

fn build_view(
    label: &str,
    kind: ViewKind,
    ordering: &[&Transaction],
    mode: DelayMode,
    x: Vec<u64>,
) -> Result<SeriesView, GuardplotError> {
    let delays = derive_delays(ordering, mode)?;
    let rates: Option<Vec<f64>> = ordering
        .iter()
        .map(|t| t.current_requests_per_minute)
        .collect();
    let summary = summarize(&delay_values(&delays), rates.as_deref())?;

    Ok(SeriesView {
        label: label.to_string(),
        kind,
        mode,
        x,
        sequence_numbers: ordering.iter().map(|t| t.global_sequence_number).collect(),
        delays,
        rates,
        summary,
    })
}

/// Turn a per-view [`GuardplotError::EmptyInput`] into a skip entry; keep
/// every other error.
fn keep_or_skip(
    view: Result<SeriesView, GuardplotError>,
    label: &str,
    skipped: &mut Vec<SkippedView>,
) -> Result<Option<SeriesView>, GuardplotError> {
    match view {
        Ok(view) => Ok(Some(view)),
        Err(err @ GuardplotError::EmptyInput(_)) => {
            tracing::warn!(view = label, "skipping view: {err}");
            skipped.push(SkippedView {
                label: label.to_string(),
                reason: err.to_string(),
            });
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn file_name_of(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

fn basename_of(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
