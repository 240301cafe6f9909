//! Permission engine.
//!
//! Every check is a pure function of `(ticket, actor)`, evaluated fresh each
//! time. A decision is the conjunction of two layers:
//!
//! 1. the role matrix ([`grant`]): which relationship to the ticket a role
//!    needs before an action is even considered;
//! 2. the state gate: whether the ticket's current state admits the action.
//!
//! Everything not explicitly granted is denied.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::{Actor, Role};
use crate::ticket::{Comment, Ticket, TicketStatus};
use crate::transitions;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A discrete thing an actor may try to do to a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Comment,
    Close,
    Rate,
    Reopen,
    Assign,
    Escalate,
    ChangeStatus,
    /// Edit ticket details such as tags.
    Update,
    ChangePriority,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::View,
        Action::Comment,
        Action::Close,
        Action::Rate,
        Action::Reopen,
        Action::Assign,
        Action::Escalate,
        Action::ChangeStatus,
        Action::Update,
        Action::ChangePriority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Comment => "comment",
            Self::Close => "close",
            Self::Rate => "rate",
            Self::Reopen => "reopen",
            Self::Assign => "assign",
            Self::Escalate => "escalate",
            Self::ChangeStatus => "change_status",
            Self::Update => "update",
            Self::ChangePriority => "change_priority",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role matrix
// ---------------------------------------------------------------------------

/// Relationship to the ticket a role must have for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Always,
    Owner,
    OwnerOrAssignee,
    Never,
}

/// The role × action matrix.
///
/// Both levels are matched exhaustively, so a new role or action does not
/// compile until every cell has been decided.
pub fn grant(role: Role, action: Action) -> Grant {
    match role {
        Role::Admin | Role::Moderator | Role::SupportAgent => staff_grant(action),
        Role::User | Role::Treasurer => member_grant(action),
    }
}

fn staff_grant(action: Action) -> Grant {
    match action {
        Action::View
        | Action::Comment
        | Action::Close
        | Action::Reopen
        | Action::Assign
        | Action::Escalate
        | Action::ChangeStatus
        | Action::Update
        | Action::ChangePriority => Grant::Always,
        // Ratings are customer feedback; staff only rate tickets they raised.
        Action::Rate => Grant::Owner,
    }
}

fn member_grant(action: Action) -> Grant {
    match action {
        Action::View | Action::Comment => Grant::OwnerOrAssignee,
        Action::Close | Action::Reopen | Action::Rate | Action::Update => Grant::Owner,
        Action::Assign | Action::Escalate | Action::ChangeStatus | Action::ChangePriority => {
            Grant::Never
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn relationship_allows(grant: Grant, ticket: &Ticket, actor: &Actor) -> Result<(), &'static str> {
    match grant {
        Grant::Always => Ok(()),
        Grant::Owner if ticket.is_owner(actor.id) => Ok(()),
        Grant::Owner => Err("only the ticket owner may do this"),
        Grant::OwnerOrAssignee if ticket.is_owner(actor.id) || ticket.is_assignee(actor.id) => {
            Ok(())
        }
        Grant::OwnerOrAssignee => Err("only the owner or assignee may do this"),
        Grant::Never => Err("role is not permitted to do this"),
    }
}

fn state_allows(ticket: &Ticket, actor: &Actor, action: Action) -> Result<(), &'static str> {
    let status = ticket.status;
    match action {
        Action::View | Action::ChangeStatus => Ok(()),
        Action::Comment => match status {
            TicketStatus::Closed => Err("ticket is closed"),
            TicketStatus::Cancelled => Err("ticket is cancelled"),
            TicketStatus::Resolved if !actor.role.is_admin_tier() => {
                Err("resolved tickets only accept staff comments")
            }
            _ => Ok(()),
        },
        Action::Close => match status {
            TicketStatus::Closed => Err("ticket is already closed"),
            TicketStatus::Cancelled => Err("ticket is cancelled"),
            _ => Ok(()),
        },
        Action::Rate => {
            if status != TicketStatus::Resolved {
                Err("only resolved tickets can be rated")
            } else if ticket.rating.is_some() {
                Err("ticket has already been rated")
            } else {
                Ok(())
            }
        }
        Action::Reopen => match status {
            TicketStatus::Closed => Ok(()),
            _ => Err("only closed tickets can be reopened"),
        },
        Action::Assign | Action::Update | Action::ChangePriority => {
            if status.is_finished() {
                Err("ticket is no longer active")
            } else {
                Ok(())
            }
        }
        Action::Escalate => {
            if status.is_finished() || status == TicketStatus::Resolved {
                Err("only active tickets can be escalated")
            } else {
                Ok(())
            }
        }
    }
}

fn evaluate(ticket: &Ticket, actor: &Actor, action: Action) -> Result<(), &'static str> {
    relationship_allows(grant(actor.role, action), ticket, actor)?;
    state_allows(ticket, actor, action)
}

/// Whether `actor` may currently perform `action` on `ticket`.
pub fn is_allowed(ticket: &Ticket, actor: &Actor, action: Action) -> bool {
    evaluate(ticket, actor, action).is_ok()
}

/// Like [`is_allowed`] but yields a [`CoreError::PermissionDenied`] carrying
/// the reason.
pub fn require(ticket: &Ticket, actor: &Actor, action: Action) -> Result<(), CoreError> {
    evaluate(ticket, actor, action).map_err(|reason| {
        tracing::debug!(
            ticket_id = %ticket.id,
            actor = %actor.id,
            role = %actor.role,
            action = action.as_str(),
            reason,
            "Permission denied",
        );
        CoreError::denied(action, reason)
    })
}

/// Owner, assignee or any admin-tier role.
pub fn can_view(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::View)
}

/// Not on closed or cancelled tickets; resolved tickets take staff comments only.
pub fn can_comment(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Comment)
}

/// Owner or admin tier, while the ticket is neither closed nor cancelled.
pub fn can_close(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Close)
}

/// Owner only, once, while the ticket is resolved.
pub fn can_rate(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Rate)
}

/// Owner or admin tier, on closed tickets.
pub fn can_reopen(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Reopen)
}

/// Admin tier, while the ticket is neither closed nor cancelled.
pub fn can_assign(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Assign)
}

/// Admin tier, on tickets that are still being worked.
pub fn can_escalate(ticket: &Ticket, actor: &Actor) -> bool {
    is_allowed(ticket, actor, Action::Escalate)
}

/// Raw status change to `target`: admin tier and a legal edge.
pub fn can_change_status(ticket: &Ticket, actor: &Actor, target: TicketStatus) -> bool {
    is_allowed(ticket, actor, Action::ChangeStatus) && transitions::can_transition(ticket.status, target)
}

/// Staff may post notes hidden from the customer.
pub fn can_post_internal(actor: &Actor) -> bool {
    actor.role.is_admin_tier()
}

/// Comments `actor` is allowed to read. Internal notes are staff-only.
pub fn visible_comments<'a>(ticket: &'a Ticket, actor: &Actor) -> Vec<&'a Comment> {
    if !can_view(ticket, actor) {
        return Vec::new();
    }
    let staff = actor.role.is_admin_tier();
    ticket
        .comments
        .iter()
        .filter(|c| staff || !c.is_internal)
        .collect()
}

// ---------------------------------------------------------------------------
// Action set
// ---------------------------------------------------------------------------

/// Snapshot of everything an actor may do to a ticket right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSet {
    pub can_view: bool,
    pub can_comment: bool,
    pub can_close: bool,
    pub can_rate: bool,
    pub can_reopen: bool,
    pub can_assign: bool,
    pub can_escalate: bool,
    pub can_change_status: bool,
    /// Statuses reachable through a raw status change by this actor.
    pub status_targets: Vec<TicketStatus>,
}

/// Evaluate every action for `actor` against `ticket` in one pass.
pub fn evaluate_permissions(ticket: &Ticket, actor: &Actor) -> ActionSet {
    let status_targets: Vec<TicketStatus> = transitions::valid_transitions(ticket.status)
        .iter()
        .copied()
        .filter(|target| can_change_status(ticket, actor, *target))
        .collect();

    ActionSet {
        can_view: can_view(ticket, actor),
        can_comment: can_comment(ticket, actor),
        can_close: can_close(ticket, actor),
        can_rate: can_rate(ticket, actor),
        can_reopen: can_reopen(ticket, actor),
        can_assign: can_assign(ticket, actor),
        can_escalate: can_escalate(ticket, actor),
        can_change_status: !status_targets.is_empty(),
        status_targets,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
