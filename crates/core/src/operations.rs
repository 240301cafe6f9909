//! Ticket mutations other than raw status changes.
//!
//! Each operation takes the current ticket by reference and returns a new
//! ticket plus the single history entry it appended. Preconditions are checked
//! before anything is copied, so a rejected call leaves no trace.

use std::collections::BTreeSet;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::CoreError;
use crate::permissions::{self, Action};
use crate::recorder::{self, Applied};
use crate::roles::Actor;
use crate::sla::SlaPolicy;
use crate::ticket::{
    Attachment, CloseReason, Comment, HistoryAction, HistoryEntry, Metrics, NewTicket, Rating,
    Ticket, TicketPriority, TicketStatus, MAX_COMMENT_LENGTH, MAX_RESOLUTION_LENGTH, MAX_TAGS,
};
use crate::transitions;
use crate::types::{EntityId, Timestamp};

/// Maximum length for a rating comment.
pub const MAX_RATING_COMMENT_LENGTH: usize = 2_000;

/// Accepted rating scores.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTicket {
    /// Defaults to `user_request` for the owner and `resolved` for staff
    /// closing a resolved ticket; required otherwise.
    pub reason: Option<CloseReason>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenTicket {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicket {
    pub assignee: EntityId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTicket {
    pub score: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTicket {
    pub resolution: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Result<BTreeSet<String>, CoreError> {
    let normalized: BTreeSet<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if normalized.len() > MAX_TAGS {
        return Err(CoreError::Validation(format!(
            "A ticket may carry at most {MAX_TAGS} tags"
        )));
    }
    Ok(normalized)
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().cloned().collect::<Vec<_>>().join(",")
}

fn non_empty_text(text: &str, field: &str, max: usize) -> Result<String, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.len() > max {
        return Err(CoreError::Validation(format!(
            "{field} exceeds maximum length of {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Open a new ticket owned by `owner`. SLA deadlines are fixed here.
pub fn create_ticket(
    input: NewTicket,
    owner: &Actor,
    ticket_number: u64,
    policy: &SlaPolicy,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    input.validate()?;
    let subject = non_empty_text(&input.subject, "Subject", 200)?;
    let tags = normalize_tags(input.tags)?;

    let ticket = Ticket {
        id: Uuid::new_v4(),
        ticket_number,
        subject,
        description: input.description,
        category: input.category,
        priority: input.priority,
        status: TicketStatus::Open,
        user_id: owner.id,
        assigned_to: None,
        assigned_by: None,
        assigned_at: None,
        resolved_by: None,
        resolved_at: None,
        closed_by: None,
        closed_at: None,
        close_reason: None,
        resolution: None,
        comments: Vec::new(),
        attachments: input.attachments,
        tags,
        context: input.context,
        rating: None,
        metrics: Metrics::default(),
        escalation: Default::default(),
        sla: policy.deadlines_for(input.priority, at)?,
        history: Vec::new(),
        created_at: at,
        updated_at: at,
    };

    let entry = HistoryEntry::new(
        HistoryAction::Created,
        format!("Ticket {} created", ticket.display_number()),
        owner,
        at,
    )
    .with_metadata(serde_json::json!({
        "category": ticket.category.as_str(),
        "priority": ticket.priority.as_str(),
    }));

    recorder::record(ticket, entry)
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// Append a comment. Non-owner comments count as responses.
pub fn add_comment(
    ticket: &Ticket,
    actor: &Actor,
    payload: NewComment,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::Comment)?;
    if payload.is_internal && !permissions::can_post_internal(actor) {
        return Err(CoreError::denied(
            Action::Comment,
            "only staff may post internal notes",
        ));
    }
    let content = non_empty_text(&payload.content, "Comment", MAX_COMMENT_LENGTH)?;

    let comment = Comment {
        id: Uuid::new_v4(),
        content,
        author: actor.id,
        author_role: actor.role,
        is_internal: payload.is_internal,
        created_at: at,
        attachments: payload.attachments,
    };

    let mut next = ticket.clone();
    if !next.is_owner(actor.id) {
        recorder::note_response(&mut next.metrics, next.created_at, at);
    }

    let description = if comment.is_internal {
        "Internal note added"
    } else {
        "Comment added"
    };
    let entry = HistoryEntry::new(HistoryAction::CommentAdded, description, actor, at)
        .with_metadata(serde_json::json!({
            "commentId": comment.id,
            "isInternal": comment.is_internal,
        }));
    next.comments.push(comment);

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Close / reopen
// ---------------------------------------------------------------------------

/// Close a ticket. Closing twice yields [`CoreError::AlreadyClosed`] and
/// appends nothing, so retries are safe.
///
/// Without an explicit reason, an owner's close records `user_request` and
/// a resolved ticket records `resolved`. Staff closing an unresolved ticket
/// they do not own must name the reason.
pub fn close_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: CloseTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    if ticket.status == TicketStatus::Closed {
        return Err(CoreError::AlreadyClosed);
    }
    transitions::validate_transition(ticket.status, TicketStatus::Closed)?;
    permissions::require(ticket, actor, Action::Close)?;

    let reason = match payload.reason {
        Some(reason) => reason,
        None if ticket.is_owner(actor.id) => CloseReason::UserRequest,
        None if ticket.status == TicketStatus::Resolved => CloseReason::Resolved,
        None => {
            return Err(CoreError::Validation(
                "A close reason is required".to_string(),
            ))
        }
    };

    let from = ticket.status;
    let mut next = ticket.clone();
    transitions::enter_status(&mut next, TicketStatus::Closed, actor, at);
    next.close_reason = Some(reason);

    let mut entry = HistoryEntry::new(
        HistoryAction::Closed,
        format!("Ticket closed ({})", reason.as_str()),
        actor,
        at,
    )
    .with_change(Some(from.to_string()), Some(TicketStatus::Closed.to_string()));
    if let Some(note) = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        entry = entry.with_metadata(serde_json::json!({ "note": note }));
    }

    recorder::record(next, entry)
}

/// Reopen a closed ticket back into `in_progress`.
pub fn reopen_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: ReopenTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    if ticket.status != TicketStatus::Closed {
        return Err(CoreError::InvalidTransition {
            from: ticket.status,
            to: TicketStatus::InProgress,
        });
    }
    permissions::require(ticket, actor, Action::Reopen)?;

    let mut next = ticket.clone();
    transitions::enter_status(&mut next, TicketStatus::InProgress, actor, at);

    let description = match payload.reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!("Ticket reopened: {reason}"),
        _ => "Ticket reopened".to_string(),
    };
    let entry = HistoryEntry::new(HistoryAction::Reopened, description, actor, at).with_change(
        Some(TicketStatus::Closed.to_string()),
        Some(TicketStatus::InProgress.to_string()),
    );

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Assign
// ---------------------------------------------------------------------------

/// Assign a ticket to a staff member. Reassigning to the current assignee is
/// rejected so every success appends exactly one entry.
pub fn assign_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: AssignTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::Assign)?;
    if ticket.assigned_to == Some(payload.assignee) {
        return Err(CoreError::Validation(format!(
            "Ticket is already assigned to {}",
            payload.assignee
        )));
    }

    let previous = ticket.assigned_to;
    let mut next = ticket.clone();
    next.assigned_to = Some(payload.assignee);
    next.assigned_by = Some(actor.id);
    next.assigned_at = Some(at);

    let entry = HistoryEntry::new(
        HistoryAction::Assigned,
        format!("Ticket assigned to {}", payload.assignee),
        actor,
        at,
    )
    .with_change(
        previous.map(|id| id.to_string()),
        Some(payload.assignee.to_string()),
    );

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

/// Rate a resolved ticket. Only the owner, only once.
pub fn rate_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: RateTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    if ticket.rating.is_some() {
        return Err(CoreError::AlreadyRated);
    }
    if ticket.status != TicketStatus::Resolved {
        return Err(CoreError::NoActiveRating);
    }
    permissions::require(ticket, actor, Action::Rate)?;
    if !RATING_RANGE.contains(&payload.score) {
        return Err(CoreError::Validation(format!(
            "Rating score {} is outside {}..={}",
            payload.score,
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }
    let comment = match payload.comment.as_deref().map(str::trim) {
        Some(c) if c.len() > MAX_RATING_COMMENT_LENGTH => {
            return Err(CoreError::Validation(format!(
                "Rating comment exceeds maximum length of {MAX_RATING_COMMENT_LENGTH} characters"
            )))
        }
        Some(c) if !c.is_empty() => Some(c.to_string()),
        _ => None,
    };

    let mut next = ticket.clone();
    next.rating = Some(Rating {
        score: payload.score,
        comment,
        rated_at: at,
    });

    let entry = HistoryEntry::new(
        HistoryAction::Rated,
        format!("Ticket rated {}/5", payload.score),
        actor,
        at,
    )
    .with_change(None, Some(payload.score.to_string()));

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Resolve / priority / tags
// ---------------------------------------------------------------------------

/// Resolve a ticket with a resolution note. Staff only.
pub fn resolve_ticket(
    ticket: &Ticket,
    actor: &Actor,
    payload: ResolveTicket,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::ChangeStatus)?;
    transitions::validate_transition(ticket.status, TicketStatus::Resolved)?;
    let resolution = non_empty_text(&payload.resolution, "Resolution", MAX_RESOLUTION_LENGTH)?;

    let from = ticket.status;
    let mut next = ticket.clone();
    transitions::enter_status(&mut next, TicketStatus::Resolved, actor, at);
    next.resolution = Some(resolution);

    let entry = HistoryEntry::new(HistoryAction::Resolved, "Ticket resolved", actor, at)
        .with_change(Some(from.to_string()), Some(TicketStatus::Resolved.to_string()))
        .with_metadata(serde_json::json!({
            "resolutionTime": next.metrics.resolution_time,
        }));

    recorder::record(next, entry)
}

/// Change priority. SLA deadlines stay as computed at creation.
pub fn change_priority(
    ticket: &Ticket,
    actor: &Actor,
    priority: TicketPriority,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::ChangePriority)?;
    if ticket.priority == priority {
        return Err(CoreError::Validation(format!(
            "Ticket priority is already '{}'",
            priority.as_str()
        )));
    }

    let from = ticket.priority;
    let mut next = ticket.clone();
    next.priority = priority;

    let entry = HistoryEntry::new(
        HistoryAction::PriorityChanged,
        format!("Priority changed from {} to {}", from.as_str(), priority.as_str()),
        actor,
        at,
    )
    .with_change(Some(from.as_str().to_string()), Some(priority.as_str().to_string()));

    recorder::record(next, entry)
}

/// Replace the tag set. Tags are trimmed, lower-cased and de-duplicated.
pub fn update_tags(
    ticket: &Ticket,
    actor: &Actor,
    tags: Vec<String>,
    at: Timestamp,
) -> Result<Applied, CoreError> {
    permissions::require(ticket, actor, Action::Update)?;
    let tags = normalize_tags(tags)?;
    if tags == ticket.tags {
        return Err(CoreError::Validation("Tags are unchanged".to_string()));
    }

    let mut next = ticket.clone();
    let old = join_tags(&next.tags);
    let new = join_tags(&tags);
    next.tags = tags;

    let entry = HistoryEntry::new(HistoryAction::Updated, "Tags updated", actor, at)
        .with_change(Some(old), Some(new));

    recorder::record(next, entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;
    use crate::fixtures::{new_ticket_input, open_ticket, staff, t0, ticket_in};
    use crate::roles::Role;

    #[test]
    fn created_ticket_starts_open_with_one_history_entry() {
        let (ticket, owner) = open_ticket();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.user_id, owner.id);
        assert_eq!(ticket.history.len(), 1);
        assert_eq!(ticket.history[0].action, HistoryAction::Created);
        assert_eq!(ticket.sla.response_deadline, t0() + Duration::minutes(8 * 60));
    }

    #[test]
    fn create_rejects_blank_subject() {
        let owner = Actor::new(Uuid::new_v4(), Role::User);
        let mut input = new_ticket_input();
        input.subject = "    ".to_string();
        let result = create_ticket(input, &owner, 1, &SlaPolicy::default(), t0());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn create_normalizes_tags() {
        let owner = Actor::new(Uuid::new_v4(), Role::User);
        let mut input = new_ticket_input();
        input.tags = vec![" Login ".into(), "login".into(), "".into(), "mobile".into()];
        let applied = create_ticket(input, &owner, 7, &SlaPolicy::default(), t0()).unwrap();
        let tags: Vec<_> = applied.ticket.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["login", "mobile"]);
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    #[test]
    fn staff_comment_counts_as_first_response() {
        let (ticket, owner) = open_ticket();
        let agent = staff(Role::SupportAgent);

        let applied = add_comment(
            &ticket,
            &owner,
            NewComment {
                content: "Any update?".into(),
                is_internal: false,
                attachments: vec![],
            },
            t0() + Duration::minutes(5),
        )
        .unwrap();
        assert_eq!(applied.ticket.metrics.response_count, 0);
        assert_eq!(applied.ticket.metrics.first_response_time, None);

        let applied = add_comment(
            &applied.ticket,
            &agent,
            NewComment {
                content: "Looking into it".into(),
                is_internal: false,
                attachments: vec![],
            },
            t0() + Duration::minutes(42),
        )
        .unwrap();
        assert_eq!(applied.ticket.metrics.response_count, 1);
        assert_eq!(applied.ticket.metrics.first_response_time, Some(42));
        assert_eq!(applied.ticket.comments.len(), 2);
        assert_eq!(applied.entry.action, HistoryAction::CommentAdded);
    }

    #[test]
    fn empty_comment_is_rejected() {
        let (ticket, owner) = open_ticket();
        let result = add_comment(
            &ticket,
            &owner,
            NewComment {
                content: "  \n ".into(),
                is_internal: false,
                attachments: vec![],
            },
            t0(),
        );
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn owner_cannot_post_internal_note() {
        let (ticket, owner) = open_ticket();
        let result = add_comment(
            &ticket,
            &owner,
            NewComment {
                content: "secret".into(),
                is_internal: true,
                attachments: vec![],
            },
            t0(),
        );
        assert_matches!(
            result,
            Err(CoreError::PermissionDenied {
                action: Action::Comment,
                ..
            })
        );
    }

    #[test]
    fn internal_notes_are_hidden_from_owner() {
        let (ticket, owner) = open_ticket();
        let agent = staff(Role::SupportAgent);
        let applied = add_comment(
            &ticket,
            &agent,
            NewComment {
                content: "Customer seems to use an old app build".into(),
                is_internal: true,
                attachments: vec![],
            },
            t0() + Duration::minutes(1),
        )
        .unwrap();

        assert!(permissions::visible_comments(&applied.ticket, &owner).is_empty());
        assert_eq!(permissions::visible_comments(&applied.ticket, &agent).len(), 1);
    }

    // -----------------------------------------------------------------------
    // Close / reopen
    // -----------------------------------------------------------------------

    #[test]
    fn owner_close_defaults_to_user_request() {
        let (ticket, owner) = open_ticket();
        let applied = close_ticket(&ticket, &owner, CloseTicket::default(), t0()).unwrap();
        assert_eq!(applied.ticket.status, TicketStatus::Closed);
        assert_eq!(applied.ticket.close_reason, Some(CloseReason::UserRequest));
        assert_eq!(applied.ticket.closed_by, Some(owner.id));
        assert_eq!(applied.ticket.closed_at, Some(t0()));
    }

    #[test]
    fn staff_must_give_reason_for_active_ticket() {
        let (ticket, _) = open_ticket();
        let admin = staff(Role::Admin);
        let result = close_ticket(&ticket, &admin, CloseTicket::default(), t0());
        assert_matches!(result, Err(CoreError::Validation(_)));

        let payload = CloseTicket {
            reason: Some(CloseReason::Duplicate),
            ..CloseTicket::default()
        };
        let applied = close_ticket(&ticket, &admin, payload, t0()).unwrap();
        assert_eq!(applied.ticket.close_reason, Some(CloseReason::Duplicate));
        assert_eq!(applied.ticket.history.len(), ticket.history.len() + 1);
    }

    #[test]
    fn closing_twice_reports_already_closed() {
        let (ticket, owner) = open_ticket();
        let closed = close_ticket(&ticket, &owner, CloseTicket::default(), t0())
            .unwrap()
            .ticket;
        let result = close_ticket(&closed, &owner, CloseTicket::default(), t0());
        assert_matches!(result, Err(CoreError::AlreadyClosed));
    }

    #[test]
    fn cancelled_ticket_cannot_be_closed() {
        let (ticket, owner) = ticket_in(TicketStatus::Cancelled);
        let result = close_ticket(&ticket, &owner, CloseTicket::default(), t0());
        assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn reopen_clears_close_fields() {
        let (ticket, owner) = open_ticket();
        let closed = close_ticket(&ticket, &owner, CloseTicket::default(), t0())
            .unwrap()
            .ticket;
        let reopened = reopen_ticket(
            &closed,
            &owner,
            ReopenTicket {
                reason: Some("Still broken".into()),
            },
            t0() + Duration::hours(1),
        )
        .unwrap();

        assert_eq!(reopened.ticket.status, TicketStatus::InProgress);
        assert_eq!(reopened.ticket.closed_at, None);
        assert_eq!(reopened.ticket.close_reason, None);
        assert_eq!(reopened.entry.action, HistoryAction::Reopened);
        assert_eq!(reopened.entry.description, "Ticket reopened: Still broken");
    }

    #[test]
    fn reopen_of_open_ticket_is_invalid_transition() {
        let (ticket, owner) = open_ticket();
        let result = reopen_ticket(&ticket, &owner, ReopenTicket::default(), t0());
        assert_matches!(
            result,
            Err(CoreError::InvalidTransition {
                from: TicketStatus::Open,
                to: TicketStatus::InProgress
            })
        );
    }

    // -----------------------------------------------------------------------
    // Assign / rate / resolve / priority / tags
    // -----------------------------------------------------------------------

    #[test]
    fn assignment_records_previous_assignee() {
        let (ticket, _) = open_ticket();
        let admin = staff(Role::Admin);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let a = assign_ticket(&ticket, &admin, AssignTicket { assignee: first }, t0()).unwrap();
        let b = assign_ticket(&a.ticket, &admin, AssignTicket { assignee: second }, t0()).unwrap();

        assert_eq!(b.ticket.assigned_to, Some(second));
        assert_eq!(b.entry.old_value, Some(first.to_string()));
        assert_matches!(
            assign_ticket(&b.ticket, &admin, AssignTicket { assignee: second }, t0()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rating_requires_resolved_status() {
        let (ticket, owner) = open_ticket();
        let result = rate_ticket(
            &ticket,
            &owner,
            RateTicket {
                score: 5,
                comment: None,
            },
            t0(),
        );
        assert_matches!(result, Err(CoreError::NoActiveRating));
    }

    #[test]
    fn rating_twice_reports_already_rated() {
        let (ticket, owner) = ticket_in(TicketStatus::Resolved);
        let payload = RateTicket {
            score: 4,
            comment: Some("Quick fix, thanks".into()),
        };
        let rated = rate_ticket(&ticket, &owner, payload.clone(), t0()).unwrap();
        assert_eq!(rated.ticket.rating.as_ref().map(|r| r.score), Some(4));
        assert_matches!(
            rate_ticket(&rated.ticket, &owner, payload, t0()),
            Err(CoreError::AlreadyRated)
        );
    }

    #[test]
    fn resolve_sets_resolution_and_clears_escalation() {
        let (mut ticket, _) = open_ticket();
        ticket.escalation.is_escalated = true;
        let agent = staff(Role::SupportAgent);

        let applied = resolve_ticket(
            &ticket,
            &agent,
            ResolveTicket {
                resolution: "Password reset link re-sent".into(),
            },
            t0() + Duration::minutes(90),
        )
        .unwrap();

        assert_eq!(applied.ticket.status, TicketStatus::Resolved);
        assert_eq!(applied.ticket.resolved_by, Some(agent.id));
        assert_eq!(applied.ticket.metrics.resolution_time, Some(90));
        assert!(!applied.ticket.escalation.is_escalated);
        assert_eq!(applied.entry.action, HistoryAction::Resolved);
    }

    #[test]
    fn user_cannot_resolve() {
        let (ticket, owner) = open_ticket();
        let result = resolve_ticket(
            &ticket,
            &owner,
            ResolveTicket {
                resolution: "fixed it myself".into(),
            },
            t0(),
        );
        assert_matches!(result, Err(CoreError::PermissionDenied { .. }));
    }

    #[test]
    fn priority_change_keeps_deadlines() {
        let (ticket, _) = open_ticket();
        let applied =
            change_priority(&ticket, &staff(Role::Moderator), TicketPriority::Urgent, t0()).unwrap();
        assert_eq!(applied.ticket.priority, TicketPriority::Urgent);
        assert_eq!(applied.ticket.sla.response_deadline, ticket.sla.response_deadline);
        assert_eq!(applied.entry.action, HistoryAction::PriorityChanged);
    }

    #[test]
    fn owner_can_retag_but_not_with_no_change() {
        let (ticket, owner) = open_ticket();
        let applied = update_tags(&ticket, &owner, vec!["Refund".into()], t0()).unwrap();
        assert!(applied.ticket.tags.contains("refund"));
        assert_matches!(
            update_tags(&applied.ticket, &owner, vec!["refund".into()], t0()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let (ticket, owner) = open_ticket();
        let result = update_tags(&ticket, &owner, vec!["late".into()], t0() - Duration::seconds(1));
        assert_matches!(result, Err(CoreError::Validation(_)));
    }
}
