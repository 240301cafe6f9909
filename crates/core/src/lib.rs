//! Support-ticket lifecycle engine.
//!
//! Governs how a ticket moves between states, who may trigger each change,
//! when a ticket breaches its SLA, and how reporting statistics are
//! normalized. The crate performs no I/O: callers pass a fully loaded
//! [`ticket::Ticket`] and receive either a new ticket plus the history entry
//! that was appended, or a typed [`error::CoreError`].

pub mod error;
pub mod operations;
pub mod permissions;
pub mod recorder;
pub mod roles;
pub mod sla;
pub mod stats;
pub mod ticket;
pub mod transitions;
pub mod types;

pub use error::CoreError;
pub use operations::{
    add_comment, assign_ticket, change_priority, close_ticket, create_ticket, rate_ticket,
    reopen_ticket, resolve_ticket, update_tags,
};
pub use permissions::{evaluate_permissions, ActionSet};
pub use recorder::Applied;
pub use roles::{Actor, Role};
pub use sla::{compute_sla_status, escalate_ticket, SlaPolicy, SlaStatus};
pub use stats::{normalize_stats, TicketStats};
pub use ticket::{Ticket, TicketStatus};
pub use transitions::apply_transition;
