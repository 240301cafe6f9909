//! Command-line surface over the engine.
//!
//! Each command reads already-serialized tickets or reporting payloads from
//! disk, runs one engine operation and yields the JSON to print.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use helpdesk_core::permissions::evaluate_permissions;
use helpdesk_core::roles::{Actor, Role};
use helpdesk_core::sla::compute_sla_status;
use helpdesk_core::stats::normalize_stats;
use helpdesk_core::ticket::{Ticket, TicketStatus};
use helpdesk_core::transitions::apply_transition;
use helpdesk_core::types::Timestamp;

use crate::config::EngineConfig;

#[derive(Debug, Parser)]
#[command(name = "helpdesk", version, about = "Support-ticket lifecycle engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The acting user, as resolved by the identity service.
#[derive(Debug, Clone, Args)]
pub struct ActorArgs {
    #[arg(long = "actor-id", env = "HELPDESK_ACTOR_ID")]
    pub actor_id: Uuid,
    #[arg(long, env = "HELPDESK_ROLE")]
    pub role: Role,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        Actor::new(self.actor_id, self.role)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every action the actor may currently take on a ticket.
    Permissions {
        #[arg(long)]
        ticket: PathBuf,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Evaluate SLA deadlines and overdue flags.
    Sla {
        #[arg(long)]
        ticket: PathBuf,
        /// RFC 3339 instant to evaluate at (default: now).
        #[arg(long)]
        now: Option<Timestamp>,
    },
    /// Apply a raw status change and print the new ticket and history entry.
    Transition {
        #[arg(long)]
        ticket: PathBuf,
        #[arg(long)]
        to: TicketStatus,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// Normalize a reporting payload into the canonical statistics record.
    Stats {
        #[arg(long)]
        payload: PathBuf,
    },
    /// Print the effective SLA policy.
    Policy,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Run `command`, using `now` wherever the caller did not pin an instant.
pub fn run(command: &Command, config: &EngineConfig, now: Timestamp) -> anyhow::Result<serde_json::Value> {
    let output = match command {
        Command::Permissions { ticket, actor } => {
            let ticket: Ticket = read_json(ticket)?;
            serde_json::to_value(evaluate_permissions(&ticket, &actor.actor()))?
        }
        Command::Sla { ticket, now: at } => {
            let ticket: Ticket = read_json(ticket)?;
            serde_json::to_value(compute_sla_status(&ticket, at.unwrap_or(now)))?
        }
        Command::Transition {
            ticket,
            to,
            actor,
            at,
        } => {
            let ticket: Ticket = read_json(ticket)?;
            let applied = apply_transition(&ticket, *to, &actor.actor(), at.unwrap_or(now))?;
            serde_json::to_value(applied)?
        }
        Command::Stats { payload } => {
            let raw: serde_json::Value = read_json(payload)?;
            serde_json::to_value(normalize_stats(&raw))?
        }
        Command::Policy => serde_json::to_value(config)?,
    };

    tracing::debug!(command = command.name(), "Command completed");
    Ok(output)
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Permissions { .. } => "permissions",
            Self::Sla { .. } => "sla",
            Self::Transition { .. } => "transition",
            Self::Stats { .. } => "stats",
            Self::Policy => "policy",
        }
    }
}
