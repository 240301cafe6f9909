//! Shared fixtures for core integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use helpdesk_core::operations::create_ticket;
use helpdesk_core::roles::{Actor, Role};
use helpdesk_core::sla::SlaPolicy;
use helpdesk_core::ticket::{NewTicket, Ticket, TicketCategory, TicketContext, TicketPriority};
use helpdesk_core::types::Timestamp;

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap()
}

pub fn actor(role: Role) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}

pub fn new_ticket(priority: TicketPriority) -> NewTicket {
    NewTicket {
        subject: "Donation receipt missing".to_string(),
        description: "I donated last week but never received a receipt".to_string(),
        category: TicketCategory::Donation,
        priority,
        tags: vec!["receipt".to_string()],
        context: TicketContext {
            url: Some("https://example.org/donate".to_string()),
            device_info: Some("iOS 19".to_string()),
            related_donation: Some(Uuid::new_v4()),
            related_payment: None,
        },
        attachments: vec![],
    }
}

/// Create a ticket of the given priority at [`t0`], returning it and its owner.
pub fn created(priority: TicketPriority) -> (Ticket, Actor) {
    let owner = actor(Role::User);
    let applied = create_ticket(new_ticket(priority), &owner, 101, &SlaPolicy::default(), t0())
        .expect("fixture ticket should be valid");
    (applied.ticket, owner)
}
