use std::collections::BTreeMap;

use crate::error::GuardplotError;
use crate::log::model::Transaction;

/// Transactions of one client thread, ordered by thread sequence number.
pub type ThreadGroups<'a> = BTreeMap<String, Vec<&'a Transaction>>;

/// Partition transactions by `thread_id`.
///
/// Each group keeps input order until it is stably sorted by
/// `thread_sequence_number`. Groups are keyed in lexical thread id order.
pub fn group_by_thread(transactions: &[Transaction]) -> ThreadGroups<'_> {
    let mut groups: ThreadGroups<'_> = BTreeMap::new();
    for tx in transactions {
        groups.entry(tx.thread_id.clone()).or_default().push(tx);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|tx| tx.thread_sequence_number);
    }
    tracing::debug!(threads = groups.len(), "grouped transactions by thread");
    groups
}

/// All transactions ordered by `global_sequence_number`.
pub fn order_by_global_sequence(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.global_sequence_number);
    ordered
}

/// All transactions ordered by `request_issue_time_ms`.
///
/// Threads run concurrently, so issue times may interleave freely with the
/// global sequence. Within one thread they may not: a transaction issued
/// before its thread predecessor means the log's clock is skewed, and the
/// whole timeline is rejected with [`GuardplotError::OrderingViolation`].
pub fn order_by_issue_time(
    transactions: &[Transaction],
) -> Result<Vec<&Transaction>, GuardplotError> {
    let mut timed = Vec::with_capacity(transactions.len());
    for tx in transactions {
        let issued = tx.request_issue_time_ms.ok_or_else(|| {
            GuardplotError::Format(format!(
                "transaction #{} has no request issue time",
                tx.global_sequence_number
            ))
        })?;
        timed.push((issued, tx));
    }

    check_thread_timelines(&timed)?;

    timed.sort_by(|(a_ms, a), (b_ms, b)| {
        a_ms.total_cmp(b_ms)
            .then(a.global_sequence_number.cmp(&b.global_sequence_number))
    });

    Ok(timed.into_iter().map(|(_, tx)| tx).collect())
}

/// Issue times must not decrease along each thread's sequence.
fn check_thread_timelines(timed: &[(f64, &Transaction)]) -> Result<(), GuardplotError> {
    let mut threads: BTreeMap<&str, Vec<(f64, &Transaction)>> = BTreeMap::new();
    for &(issued, tx) in timed {
        threads.entry(tx.thread_id.as_str()).or_default().push((issued, tx));
    }

    for timeline in threads.values_mut() {
        timeline.sort_by_key(|(_, tx)| tx.thread_sequence_number);
        for pair in timeline.windows(2) {
            let (previous_ms, previous) = pair[0];
            let (current_ms, current) = pair[1];
            if current_ms < previous_ms {
                return Err(GuardplotError::OrderingViolation {
                    previous_seq: previous.global_sequence_number,
                    previous_ms,
                    current_seq: current.global_sequence_number,
                    current_ms,
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
