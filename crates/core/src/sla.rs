//! SLA & escalation tracker.
//!
//! Deadlines are fixed at creation from a priority-keyed policy table. The
//! overdue flags are pure functions of `(now, deadline, event occurred)` and
//! are recomputed on demand; the copy stored on [`Sla`] is only a snapshot.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::permissions::{self, Action};
use crate::recorder::{self, Applied};
use crate::roles::Actor;
use crate::ticket::{HistoryAction, HistoryEntry, Sla, Ticket, TicketPriority};
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Response and resolution windows for one priority, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaWindow {
    pub response_minutes: i64,
    pub resolution_minutes: i64,
}

impl SlaWindow {
    pub const fn new(response_minutes: i64, resolution_minutes: i64) -> Self {
        Self {
            response_minutes,
            resolution_minutes,
        }
    }
}

pub const DEFAULT_URGENT_WINDOW: SlaWindow = SlaWindow::new(60, 4 * 60);
pub const DEFAULT_HIGH_WINDOW: SlaWindow = SlaWindow::new(4 * 60, 24 * 60);
pub const DEFAULT_MEDIUM_WINDOW: SlaWindow = SlaWindow::new(8 * 60, 48 * 60);
pub const DEFAULT_LOW_WINDOW: SlaWindow = SlaWindow::new(24 * 60, 72 * 60);

/// Longest window a policy may configure (one year).
pub const MAX_SLA_WINDOW_MINUTES: i64 = 365 * 24 * 60;

/// SLA windows keyed by priority.
///
/// Invariant: both windows get strictly shorter as priority rises, and a
/// response window never exceeds its resolution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaPolicy {
    low: SlaWindow,
    medium: SlaWindow,
    high: SlaWindow,
    urgent: SlaWindow,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_WINDOW,
            medium: DEFAULT_MEDIUM_WINDOW,
            high: DEFAULT_HIGH_WINDOW,
            urgent: DEFAULT_URGENT_WINDOW,
        }
    }
}

impl SlaPolicy {
    pub fn new(
        low: SlaWindow,
        medium: SlaWindow,
        high: SlaWindow,
        urgent: SlaWindow,
    ) -> Result<Self, CoreError> {
        let ordered = [
            (TicketPriority::Low, low),
            (TicketPriority::Medium, medium),
            (TicketPriority::High, high),
            (TicketPriority::Urgent, urgent),
        ];

        for (priority, window) in ordered {
            if window.response_minutes <= 0 || window.resolution_minutes <= 0 {
                return Err(CoreError::Validation(format!(
                    "SLA windows for '{}' must be positive",
                    priority.as_str()
                )));
            }
            if window.resolution_minutes > MAX_SLA_WINDOW_MINUTES {
                return Err(CoreError::Validation(format!(
                    "SLA windows for '{}' must not exceed {MAX_SLA_WINDOW_MINUTES} minutes",
                    priority.as_str()
                )));
            }
            if window.response_minutes > window.resolution_minutes {
                return Err(CoreError::Validation(format!(
                    "SLA response window for '{}' exceeds its resolution window",
                    priority.as_str()
                )));
            }
        }

        for pair in ordered.windows(2) {
            let (lower, lower_window) = pair[0];
            let (higher, higher_window) = pair[1];
            if higher_window.response_minutes >= lower_window.response_minutes
                || higher_window.resolution_minutes >= lower_window.resolution_minutes
            {
                return Err(CoreError::Validation(format!(
                    "SLA windows for '{}' must be shorter than for '{}'",
                    higher.as_str(),
                    lower.as_str()
                )));
            }
        }

        Ok(Self {
            low,
            medium,
            high,
            urgent,
        })
    }

    /// Configured windows for `priority`.
    pub fn window(&self, priority: TicketPriority) -> SlaWindow {
        match priority {
            TicketPriority::Low => self.low,
            TicketPriority::Medium => self.medium,
            TicketPriority::High => self.high,
            TicketPriority::Urgent => self.urgent,
        }
    }

    /// Time allowed until the first staff response.
    pub fn response_window(&self, priority: TicketPriority) -> Duration {
        Duration::minutes(self.window(priority).response_minutes)
    }

    /// Time allowed until resolution.
    pub fn resolution_window(&self, priority: TicketPriority) -> Duration {
        Duration::minutes(self.window(priority).resolution_minutes)
    }

    /// Fresh SLA record for a ticket created at `created_at`.
    ///
    /// Fails when a deadline falls outside the representable date range.
    pub fn deadlines_for(
        &self,
        priority: TicketPriority,
        created_at: Timestamp,
    ) -> Result<Sla, CoreError> {
        let deadline = |window: Duration| {
            created_at.checked_add_signed(window).ok_or_else(|| {
                CoreError::Validation(format!(
                    "SLA deadline for '{}' is out of range",
                    priority.as_str()
                ))
            })
        };

        Ok(Sla {
            response_deadline: deadline(self.response_window(priority))?,
            resolution_deadline: deadline(self.resolution_window(priority))?,
            is_response_overdue: false,
            is_resolution_overdue: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Status evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaStatus {
    pub response_overdue: bool,
    pub resolution_overdue: bool,
    pub response_deadline: Timestamp,
    pub resolution_deadline: Timestamp,
}

/// Evaluate the SLA flags of `ticket` at `now`.
///
/// Response is overdue once `now` passes the response deadline while no
/// non-owner comment has been recorded; resolution likewise until the ticket
/// has been resolved.
pub fn compute_sla_status(ticket: &Ticket, now: Timestamp) -> SlaStatus {
    let responded = ticket.metrics.first_response_time.is_some();
    let resolved = ticket.resolved_at.is_some();

    SlaStatus {
        response_overdue: !responded && now > ticket.sla.response_deadline,
        resolution_overdue: !resolved && now > ticket.sla.resolution_deadline,
        response_deadline: ticket.sla.response_deadline,
        resolution_deadline: ticket.sla.resolution_deadline,
    }
}

/// Overwrite the snapshot flags on `ticket.sla` with the values at `now`.
pub fn refresh_flags(ticket: &mut Ticket, now: Timestamp) {
    let status = compute_sla_status(ticket, now);
    ticket.sla.is_response_overdue = status.response_overdue;
    ticket.sla.is_resolution_overdue = status.resolution_overdue;
}

// ---------------------------------------------------------------------------
// Escalation
// ---------------------------------------------------------------------------

/// Maximum length for an escalation reason.
pub const MAX_ESCALATION_REASON_LENGTH: usize = 2_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateTicket {
    pub escalated_to: Option<EntityId>,
    pub reason: String,
}

/// Mark a ticket as needing a higher-tier handler.
///
/// Re-escalating an already escalated ticket is allowed and counts as a new
/// escalation. The flag is only cleared by resolving or closing the ticket.
pub fn escalate_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: EscalateTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::Escalate)?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(CoreError::Validation(
            "Escalation reason must not be empty".to_string(),
        ));
    }
    if reason.len() > MAX_ESCALATION_REASON_LENGTH {
        return Err(CoreError::Validation(format!(
            "Escalation reason exceeds maximum length of {MAX_ESCALATION_REASON_LENGTH} characters"
        )));
    }

    let mut next = ticket.clone();
    let previous_target = next.escalation.escalated_to;
    next.escalation.is_escalated = true;
    next.escalation.escalated_at = Some(at);
    next.escalation.escalated_by = Some(actor.id);
    next.escalation.escalated_to = payload.escalated_to;
    next.escalation.escalation_reason = Some(reason.to_string());
    recorder::note_escalation(&mut next.metrics);

    let entry = HistoryEntry::new(
        HistoryAction::Escalated,
        format!("Ticket escalated: {reason}"),
        actor,
        at,
    )
    .with_change(
        previous_target.map(|id| id.to_string()),
        payload.escalated_to.map(|id| id.to_string()),
    )
    .with_metadata(serde_json::json!({
        "escalationCount": next.metrics.escalation_count,
    }));

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let d = SlaPolicy::default();
        assert!(SlaPolicy::new(d.low, d.medium, d.high, d.urgent).is_ok());
    }

    #[test]
    fn default_windows_shrink_with_priority() {
        let policy = SlaPolicy::default();
        let mut previous: Option<SlaWindow> = None;
        for priority in TicketPriority::ALL {
            let window = policy.window(priority);
            if let Some(prev) = previous {
                assert!(window.response_minutes < prev.response_minutes);
                assert!(window.resolution_minutes < prev.resolution_minutes);
            }
            previous = Some(window);
        }
    }

    #[test]
    fn non_monotonic_policy_is_rejected() {
        let result = SlaPolicy::new(
            DEFAULT_LOW_WINDOW,
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_URGENT_WINDOW,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("must be shorter"));
    }

    #[test]
    fn response_longer_than_resolution_is_rejected() {
        let result = SlaPolicy::new(
            DEFAULT_LOW_WINDOW,
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_HIGH_WINDOW,
            SlaWindow::new(120, 60),
        );
        assert!(result.is_err());
    }

    #[test]
    fn window_longer_than_a_year_is_rejected() {
        let err = SlaPolicy::new(
            SlaWindow::new(i64::MAX / 2, i64::MAX - 1),
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_HIGH_WINDOW,
            DEFAULT_URGENT_WINDOW,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn longest_allowed_window_yields_deadlines() {
        let policy = SlaPolicy::new(
            SlaWindow::new(MAX_SLA_WINDOW_MINUTES - 1, MAX_SLA_WINDOW_MINUTES),
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_HIGH_WINDOW,
            DEFAULT_URGENT_WINDOW,
        )
        .unwrap();
        let created = crate::fixtures::t0();
        let sla = policy.deadlines_for(TicketPriority::Low, created).unwrap();
        assert_eq!(sla.resolution_deadline, created + Duration::days(365));
    }

    #[test]
    fn deadline_past_the_calendar_is_an_error() {
        let err = SlaPolicy::default()
            .deadlines_for(TicketPriority::Low, chrono::DateTime::<chrono::Utc>::MAX_UTC)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn zero_window_is_rejected() {
        let result = SlaPolicy::new(
            SlaWindow::new(0, 10),
            DEFAULT_MEDIUM_WINDOW,
            DEFAULT_HIGH_WINDOW,
            DEFAULT_URGENT_WINDOW,
        );
        assert!(result.unwrap_err().to_string().contains("positive"));
    }
}
