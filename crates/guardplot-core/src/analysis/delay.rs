use serde::{Deserialize, Serialize};

use crate::error::GuardplotError;
use crate::log::model::Transaction;

// ---------------------------------------------------------------------------
// DelayMode / DelaySource
// ---------------------------------------------------------------------------

/// How an effective delay is derived for each transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMode {
    /// Client timer if it fired, otherwise the server-reported delay.
    Reported,
    /// Gap between consecutive issue times in the given ordering.
    InterArrival,
}

impl std::fmt::Display for DelayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DelayMode::Reported => "reported",
            DelayMode::InterArrival => "inter_arrival",
        };
        write!(f, "{s}")
    }
}

/// Where an effective delay value came from.
///
/// `Unmeasured` marks the ambiguous case: the client timer reported zero (or
/// nothing) and the server reported nothing, so the value is 0 without any
/// measurement behind it. A genuine zero-delay client measurement is not
/// distinguishable from an unused timer and is reported as a fallback too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelaySource {
    ClientMeasured,
    ServerReported,
    Unmeasured,
    InterArrival,
}

/// One effective delay value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DelayPoint {
    pub value_ms: f64,
    pub source: DelaySource,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Effective delay of a single transaction in [`DelayMode::Reported`].
pub fn reported_delay(tx: &Transaction) -> DelayPoint {
    match (tx.client_measured_delay_ms, tx.server_reported_delay_ms) {
        (Some(client), _) if client > 0.0 => DelayPoint {
            value_ms: client,
            source: DelaySource::ClientMeasured,
        },
        (_, Some(server)) => DelayPoint {
            value_ms: server,
            source: DelaySource::ServerReported,
        },
        _ => DelayPoint {
            value_ms: 0.0,
            source: DelaySource::Unmeasured,
        },
    }
}

/// Derive one effective delay per transaction, in the order given.
///
/// In [`DelayMode::InterArrival`] the first transaction is bootstrapped with
/// its reported delay; every later one gets the distance between its issue
/// time and the previous transaction's issue time. Every transaction must
/// carry an issue time in that mode.
pub fn derive_delays(
    ordering: &[&Transaction],
    mode: DelayMode,
) -> Result<Vec<DelayPoint>, GuardplotError> {
    match mode {
        DelayMode::Reported => Ok(ordering.iter().map(|tx| reported_delay(tx)).collect()),
        DelayMode::InterArrival => inter_arrival_delays(ordering),
    }
}

fn inter_arrival_delays(ordering: &[&Transaction]) -> Result<Vec<DelayPoint>, GuardplotError> {
    let mut points = Vec::with_capacity(ordering.len());
    let mut previous_issue: Option<f64> = None;

    for tx in ordering {
        let issued = tx.request_issue_time_ms.ok_or_else(|| {
            GuardplotError::Format(format!(
                "transaction #{} has no request issue time",
                tx.global_sequence_number
            ))
        })?;
        let point = match previous_issue {
            None => reported_delay(tx),
            Some(prev) => DelayPoint {
                value_ms: issued - prev,
                source: DelaySource::InterArrival,
            },
        };
        points.push(point);
        previous_issue = Some(issued);
    }

    Ok(points)
}

/// Plain delay values of a derived series.
pub fn delay_values(points: &[DelayPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value_ms).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
