//! Ticket status state machine.
//!
//! Transition rules:
//! - `open`          -> `in_progress`, `waiting_admin`, `resolved`, `closed`, `cancelled`
//! - `in_progress`   -> `waiting_user`, `waiting_admin`, `resolved`, `closed`, `cancelled`
//! - `waiting_user`  -> `in_progress`, `waiting_admin`, `resolved`, `closed`, `cancelled`
//! - `waiting_admin` -> `in_progress`, `resolved`, `closed`, `cancelled`
//! - `resolved`      -> `closed`
//! - `closed`        -> `in_progress` (reopen)
//! - `cancelled`     -> terminal

use crate::error::CoreError;
use crate::permissions::{self, Action};
use crate::recorder::{self, Applied};
use crate::roles::Actor;
use crate::ticket::{HistoryAction, HistoryEntry, Ticket, TicketStatus};
use crate::types::Timestamp;

use TicketStatus::*;

/// Returns the set of statuses that `from` may transition to.
pub fn valid_transitions(from: TicketStatus) -> &'static [TicketStatus] {
    match from {
        Open => &[InProgress, WaitingAdmin, Resolved, Closed, Cancelled],
        InProgress => &[WaitingUser, WaitingAdmin, Resolved, Closed, Cancelled],
        WaitingUser => &[InProgress, WaitingAdmin, Resolved, Closed, Cancelled],
        WaitingAdmin => &[InProgress, Resolved, Closed, Cancelled],
        Resolved => &[Closed],
        Closed => &[InProgress],
        Cancelled => &[],
    }
}

/// Whether `from -> to` is an edge of the state machine.
pub fn can_transition(from: TicketStatus, to: TicketStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a status transition, returning an error if not allowed.
pub fn validate_transition(from: TicketStatus, to: TicketStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

/// Raw status change. Admin tier only; users close and reopen through
/// [`crate::operations::close_ticket`] and [`crate::operations::reopen_ticket`].
///
/// The input ticket is never modified: on error nothing has changed, on
/// success the returned ticket carries exactly one new `status_changed` entry.
pub fn apply_transition(
    ticket: &Ticket,
    target: TicketStatus,
    actor: &Actor,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::ChangeStatus)?;
    validate_transition(ticket.status, target)?;

    let from = ticket.status;
    let mut next = ticket.clone();
    enter_status(&mut next, target, actor, at);

    let entry = HistoryEntry::new(
        HistoryAction::StatusChanged,
        format!("Status changed from {from} to {target}"),
        actor,
        at,
    )
    .with_change(Some(from.to_string()), Some(target.to_string()));

    recorder::record(next, entry)
}

/// Apply the field side effects of moving into `target`.
///
/// Callers must have validated the edge already.
pub(crate) fn enter_status(ticket: &mut Ticket, target: TicketStatus, actor: &Actor, at: Timestamp) {
    if ticket.status == Closed && target != Closed {
        ticket.closed_at = None;
        ticket.closed_by = None;
        ticket.close_reason = None;
    }

    match target {
        Resolved => {
            ticket.resolved_at = Some(at);
            ticket.resolved_by = Some(actor.id);
            recorder::note_resolution(&mut ticket.metrics, ticket.created_at, at);
            ticket.escalation.is_escalated = false;
        }
        Closed => {
            ticket.closed_at = Some(at);
            ticket.closed_by = Some(actor.id);
            ticket.escalation.is_escalated = false;
        }
        Open | InProgress | WaitingUser | WaitingAdmin | Cancelled => {}
    }

    ticket.status = target;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
