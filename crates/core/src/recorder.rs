//! Metrics & history recorder.
//!
//! Every mutating operation funnels its result through [`record`], which
//! appends exactly one [`HistoryEntry`], stamps `updatedAt` and refreshes the
//! cached SLA flags. Metric counters are updated by the helpers below before
//! the ticket is handed to the recorder.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Actor;
use crate::sla;
use crate::ticket::{HistoryAction, HistoryEntry, Metrics, Ticket};
use crate::types::Timestamp;

/// Result of a successful mutation: the new ticket state plus the history
/// delta that was appended to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applied {
    pub ticket: Ticket,
    pub entry: HistoryEntry,
}

impl HistoryEntry {
    pub fn new(
        action: HistoryAction,
        description: impl Into<String>,
        actor: &Actor,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            action,
            description: description.into(),
            actor: actor.id,
            actor_role: actor.role,
            timestamp,
            old_value: None,
            new_value: None,
            metadata: None,
        }
    }

    pub fn with_change(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Append `entry` to `ticket` and return the new state.
///
/// Rejects an entry stamped earlier than the last one so the audit trail stays
/// ordered by timestamp.
pub(crate) fn record(mut ticket: Ticket, entry: HistoryEntry) -> Result<Applied, CoreError> {
    if let Some(last) = ticket.history.last() {
        if entry.timestamp < last.timestamp {
            return Err(CoreError::Validation(format!(
                "Timestamp {} precedes the last history entry at {}",
                entry.timestamp, last.timestamp
            )));
        }
    }

    ticket.updated_at = entry.timestamp;
    sla::refresh_flags(&mut ticket, entry.timestamp);
    ticket.history.push(entry.clone());

    tracing::info!(
        ticket_id = %ticket.id,
        ticket_number = ticket.ticket_number,
        action = entry.action.as_str(),
        actor = %entry.actor,
        actor_role = %entry.actor_role,
        "Ticket history recorded",
    );

    Ok(Applied { ticket, entry })
}

/// Whole minutes elapsed between two instants, never negative.
pub fn minutes_between(from: Timestamp, to: Timestamp) -> i64 {
    (to - from).num_minutes().max(0)
}

/// A non-owner comment arrived. `firstResponseTime` is only ever set once.
pub(crate) fn note_response(metrics: &mut Metrics, created_at: Timestamp, at: Timestamp) {
    metrics.response_count += 1;
    if metrics.first_response_time.is_none() {
        metrics.first_response_time = Some(minutes_between(created_at, at));
    }
}

pub(crate) fn note_resolution(metrics: &mut Metrics, created_at: Timestamp, at: Timestamp) {
    metrics.resolution_time = Some(minutes_between(created_at, at));
}

pub(crate) fn note_escalation(metrics: &mut Metrics) {
    metrics.escalation_count += 1;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
