//! Ticket entity and its sub-records.
//!
//! Pure data. Behaviour lives in [`crate::transitions`], [`crate::permissions`],
//! [`crate::sla`], [`crate::recorder`] and [`crate::operations`]; every field
//! here must round-trip losslessly through the storage collaborator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length for comment content (characters).
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Maximum length for a resolution note (characters).
pub const MAX_RESOLUTION_LENGTH: usize = 5_000;

/// Maximum number of tags on a single ticket.
pub const MAX_TAGS: usize = 20;

/// Prefix used when displaying a ticket number.
pub const TICKET_NUMBER_PREFIX: &str = "TKT";

/// Render a sequential ticket number for humans, e.g. `TKT-000042`.
pub fn format_ticket_number(number: u64) -> String {
    format!("{TICKET_NUMBER_PREFIX}-{number:06}")
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a ticket. See [`crate::transitions`] for the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingUser,
    WaitingAdmin,
    Resolved,
    Closed,
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 7] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::WaitingUser,
        TicketStatus::WaitingAdmin,
        TicketStatus::Resolved,
        TicketStatus::Closed,
        TicketStatus::Cancelled,
    ];

    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "waiting_user" => Ok(Self::WaitingUser),
            "waiting_admin" => Ok(Self::WaitingAdmin),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid ticket status '{s}'. Must be one of: open, in_progress, \
                 waiting_user, waiting_admin, resolved, closed, cancelled"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::WaitingUser => "waiting_user",
            Self::WaitingAdmin => "waiting_admin",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `closed` or `cancelled`: no further work happens on the ticket.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_db(s)
    }
}

// ---------------------------------------------------------------------------
// Category / priority / close reason
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Technical,
    Payment,
    Account,
    Donation,
    BugReport,
    FeatureRequest,
    General,
    Complaint,
    Suggestion,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 9] = [
        TicketCategory::Technical,
        TicketCategory::Payment,
        TicketCategory::Account,
        TicketCategory::Donation,
        TicketCategory::BugReport,
        TicketCategory::FeatureRequest,
        TicketCategory::General,
        TicketCategory::Complaint,
        TicketCategory::Suggestion,
    ];

    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid ticket category '{s}'")))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Payment => "payment",
            Self::Account => "account",
            Self::Donation => "donation",
            Self::BugReport => "bug_report",
            Self::FeatureRequest => "feature_request",
            Self::General => "general",
            Self::Complaint => "complaint",
            Self::Suggestion => "suggestion",
        }
    }
}

/// Ticket urgency. Higher priorities get shorter SLA windows.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Urgent,
    ];

    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid ticket priority '{s}'")))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Resolved,
    Duplicate,
    Spam,
    Irrelevant,
    UserRequest,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Duplicate => "duplicate",
            Self::Spam => "spam",
            Self::Irrelevant => "irrelevant",
            Self::UserRequest => "user_request",
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    pub mime_type: String,
    pub uploaded_by: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    pub content: String,
    pub author: EntityId,
    /// Role of the author at the time of writing.
    pub author_role: Role,
    /// Internal notes are hidden from non-staff viewers.
    pub is_internal: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Where the ticket was raised from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketContext {
    pub url: Option<String>,
    pub device_info: Option<String>,
    pub related_donation: Option<EntityId>,
    pub related_payment: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// 1..=5.
    pub score: u8,
    pub comment: Option<String>,
    pub rated_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Minutes from creation to the first non-owner comment.
    pub first_response_time: Option<i64>,
    /// Minutes from creation to the (latest) move into `resolved`.
    pub resolution_time: Option<i64>,
    pub response_count: u32,
    pub escalation_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub is_escalated: bool,
    pub escalated_at: Option<Timestamp>,
    pub escalated_by: Option<EntityId>,
    pub escalated_to: Option<EntityId>,
    pub escalation_reason: Option<String>,
}

/// Deadlines are fixed at creation. The two flags are a snapshot refreshed on
/// every mutation; [`crate::sla::compute_sla_status`] is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sla {
    pub response_deadline: Timestamp,
    pub resolution_deadline: Timestamp,
    pub is_response_overdue: bool,
    pub is_resolution_overdue: bool,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    Assigned,
    StatusChanged,
    PriorityChanged,
    Escalated,
    Resolved,
    Closed,
    Reopened,
    CommentAdded,
    Rated,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Assigned => "assigned",
            Self::StatusChanged => "status_changed",
            Self::PriorityChanged => "priority_changed",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
            Self::CommentAdded => "comment_added",
            Self::Rated => "rated",
        }
    }
}

/// Immutable audit record of one mutating action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub description: String,
    pub actor: EntityId,
    pub actor_role: Role,
    pub timestamp: Timestamp,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: EntityId,
    pub ticket_number: u64,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    /// Owning user.
    pub user_id: EntityId,
    pub assigned_to: Option<EntityId>,
    pub assigned_by: Option<EntityId>,
    pub assigned_at: Option<Timestamp>,
    pub resolved_by: Option<EntityId>,
    pub resolved_at: Option<Timestamp>,
    pub closed_by: Option<EntityId>,
    pub closed_at: Option<Timestamp>,
    pub close_reason: Option<CloseReason>,
    pub resolution: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub context: TicketContext,
    pub rating: Option<Rating>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub escalation: Escalation,
    pub sla: Sla,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Ticket {
    pub fn is_owner(&self, user_id: EntityId) -> bool {
        self.user_id == user_id
    }

    pub fn is_assignee(&self, user_id: EntityId) -> bool {
        self.assigned_to == Some(user_id)
    }

    pub fn display_number(&self) -> String {
        format_ticket_number(self.ticket_number)
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for [`crate::operations::create_ticket`].
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    #[validate(length(min = 3, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: TicketContext,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_number_is_zero_padded() {
        assert_eq!(format_ticket_number(42), "TKT-000042");
        assert_eq!(format_ticket_number(1_234_567), "TKT-1234567");
    }

    #[test]
    fn every_status_round_trips_through_its_string() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::from_str_db(status.as_str()).unwrap(), status);
        }
        assert!(TicketStatus::from_str_db("reopened").is_err());
    }

    #[test]
    fn every_category_round_trips_through_its_string() {
        for category in TicketCategory::ALL {
            assert_eq!(TicketCategory::from_str_db(category.as_str()).unwrap(), category);
        }
        assert!(TicketCategory::from_str_db("billing").is_err());
    }

    #[test]
    fn priorities_are_ordered_by_urgency() {
        assert!(TicketPriority::Urgent > TicketPriority::High);
        assert!(TicketPriority::High > TicketPriority::Medium);
        assert!(TicketPriority::Medium > TicketPriority::Low);
        assert_eq!(TicketPriority::default(), TicketPriority::Medium);
    }

    #[test]
    fn only_closed_and_cancelled_are_finished() {
        let finished: Vec<_> = TicketStatus::ALL
            .into_iter()
            .filter(TicketStatus::is_finished)
            .collect();
        assert_eq!(finished, vec![TicketStatus::Closed, TicketStatus::Cancelled]);
    }

    #[test]
    fn enum_values_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&TicketCategory::FeatureRequest).unwrap(),
            "\"feature_request\""
        );
        assert_eq!(
            serde_json::to_string(&CloseReason::UserRequest).unwrap(),
            "\"user_request\""
        );
        assert_eq!(
            serde_json::to_string(&HistoryAction::StatusChanged).unwrap(),
            "\"status_changed\""
        );
    }

    #[test]
    fn new_ticket_subject_length_is_validated() {
        let input = NewTicket {
            subject: "Hi".to_string(),
            description: "Cannot log in".to_string(),
            category: TicketCategory::Account,
            priority: TicketPriority::Low,
            tags: vec![],
            context: TicketContext::default(),
            attachments: vec![],
        };
        let err = input.validate().unwrap_err();
        assert!(err.field_errors().contains_key("subject"));
    }
}
