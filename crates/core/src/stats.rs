//! Reporting statistics normalizer.
//!
//! The reporting backend answers in one of three shapes. They are decoded into
//! [`ReportPayload`] at the boundary and reduced to the canonical
//! [`TicketStats`]; nothing past this module sees the raw shape. Statistics are
//! advisory, so an unrecognised payload yields a zero record instead of an
//! error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ticket::{TicketCategory, TicketPriority, TicketStatus};

// ---------------------------------------------------------------------------
// Canonical output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: TicketCategory,
    pub count: u64,
    /// `round(count / totalTickets * 100)`.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityStat {
    pub priority: TicketPriority,
    pub count: u64,
    pub percentage: u32,
}

/// Canonical reporting record.
///
/// Breakdowns always list every category and priority in declaration order,
/// including zero counts, so equal inputs serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total_tickets: u64,
    pub open_tickets: u64,
    pub in_progress_tickets: u64,
    pub waiting_user_tickets: u64,
    pub waiting_admin_tickets: u64,
    pub resolved_tickets: u64,
    pub closed_tickets: u64,
    pub cancelled_tickets: u64,
    pub escalated_tickets: u64,
    pub overdue_tickets: u64,
    /// Minutes, two decimals.
    pub avg_response_time: f64,
    /// Minutes, two decimals.
    pub avg_resolution_time: f64,
    pub category_stats: Vec<CategoryStat>,
    pub priority_stats: Vec<PriorityStat>,
}

impl TicketStats {
    pub fn zero() -> Self {
        Tally::default().finish()
    }

    pub fn count_for_status(&self, status: TicketStatus) -> u64 {
        match status {
            TicketStatus::Open => self.open_tickets,
            TicketStatus::InProgress => self.in_progress_tickets,
            TicketStatus::WaitingUser => self.waiting_user_tickets,
            TicketStatus::WaitingAdmin => self.waiting_admin_tickets,
            TicketStatus::Resolved => self.resolved_tickets,
            TicketStatus::Closed => self.closed_tickets,
            TicketStatus::Cancelled => self.cancelled_tickets,
        }
    }
}

impl Default for TicketStats {
    fn default() -> Self {
        Self::zero()
    }
}

/// Percentage of `total`, rounded half away from zero. Zero when `total` is 0.
pub fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

fn round2(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Input shapes
// ---------------------------------------------------------------------------

/// Scalar totals, as found flat at the top level or under `stats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(alias = "total")]
    pub total_tickets: u64,
    #[serde(default, alias = "open")]
    pub open_tickets: u64,
    #[serde(default, alias = "inProgress")]
    pub in_progress_tickets: u64,
    #[serde(default, alias = "waitingUser")]
    pub waiting_user_tickets: u64,
    #[serde(default, alias = "waitingAdmin")]
    pub waiting_admin_tickets: u64,
    #[serde(default, alias = "resolved")]
    pub resolved_tickets: u64,
    #[serde(default, alias = "closed")]
    pub closed_tickets: u64,
    #[serde(default, alias = "cancelled")]
    pub cancelled_tickets: u64,
    #[serde(default, alias = "escalated")]
    pub escalated_tickets: u64,
    #[serde(default, alias = "overdue")]
    pub overdue_tickets: u64,
    #[serde(default, alias = "avgFirstResponseTime")]
    pub avg_response_time: f64,
    #[serde(default)]
    pub avg_resolution_time: f64,
}

/// One row of a category or priority breakdown. Aggregation pipelines key
/// rows by `_id`; the canonical shape uses the field name.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownRow {
    #[serde(rename = "_id", alias = "category", alias = "priority")]
    pub key: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatStats {
    #[serde(flatten)]
    pub summary: StatsSummary,
    #[serde(default)]
    pub category_stats: Vec<BreakdownRow>,
    #[serde(default)]
    pub priority_stats: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsEnvelope {
    pub stats: StatsSummary,
    #[serde(default)]
    pub category_stats: Vec<BreakdownRow>,
    #[serde(default)]
    pub priority_stats: Vec<BreakdownRow>,
}

/// One group of a `(status, category, priority)` aggregation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    pub status: String,
    pub category: String,
    pub priority: String,
    pub count: u64,
    #[serde(default)]
    pub avg_first_response_time: Option<f64>,
    #[serde(default)]
    pub avg_resolution_time: Option<f64>,
    #[serde(default)]
    pub escalated_count: u64,
    #[serde(default)]
    pub overdue_count: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KnownShape {
    Envelope(StatsEnvelope),
    Buckets(Vec<AggregateBucket>),
    Flat(FlatStats),
}

/// Every shape the reporting backend is known to produce.
#[derive(Debug, Clone)]
pub enum ReportPayload {
    Flat(FlatStats),
    Envelope(StatsEnvelope),
    Buckets(Vec<AggregateBucket>),
    Unknown,
}

impl ReportPayload {
    pub fn classify(raw: &serde_json::Value) -> Self {
        match KnownShape::deserialize(raw) {
            Ok(KnownShape::Envelope(envelope)) => Self::Envelope(envelope),
            Ok(KnownShape::Buckets(buckets)) => Self::Buckets(buckets),
            Ok(KnownShape::Flat(flat)) => Self::Flat(flat),
            Err(_) => Self::Unknown,
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Flat(_) => "flat",
            Self::Envelope(_) => "envelope",
            Self::Buckets(_) => "buckets",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tally {
    total: u64,
    by_status: BTreeMap<TicketStatus, u64>,
    by_category: BTreeMap<TicketCategory, u64>,
    by_priority: BTreeMap<TicketPriority, u64>,
    escalated: u64,
    overdue: u64,
    avg_response: f64,
    avg_resolution: f64,
}

/// Counts from the reporting backend are untrusted; saturate instead of
/// overflowing.
fn add_count(slot: &mut u64, n: u64) {
    *slot = slot.saturating_add(n);
}

impl Tally {
    fn from_summary(
        summary: StatsSummary,
        category_rows: Vec<BreakdownRow>,
        priority_rows: Vec<BreakdownRow>,
    ) -> Self {
        let by_status = [
            (TicketStatus::Open, summary.open_tickets),
            (TicketStatus::InProgress, summary.in_progress_tickets),
            (TicketStatus::WaitingUser, summary.waiting_user_tickets),
            (TicketStatus::WaitingAdmin, summary.waiting_admin_tickets),
            (TicketStatus::Resolved, summary.resolved_tickets),
            (TicketStatus::Closed, summary.closed_tickets),
            (TicketStatus::Cancelled, summary.cancelled_tickets),
        ]
        .into_iter()
        .collect();

        let mut tally = Self {
            total: summary.total_tickets,
            by_status,
            escalated: summary.escalated_tickets,
            overdue: summary.overdue_tickets,
            avg_response: summary.avg_response_time,
            avg_resolution: summary.avg_resolution_time,
            ..Self::default()
        };

        for row in category_rows {
            match TicketCategory::from_str_db(&row.key) {
                Ok(category) => add_count(tally.by_category.entry(category).or_default(), row.count),
                Err(_) => tracing::warn!(category = %row.key, "Skipping unknown category row"),
            }
        }
        for row in priority_rows {
            match TicketPriority::from_str_db(&row.key) {
                Ok(priority) => add_count(tally.by_priority.entry(priority).or_default(), row.count),
                Err(_) => tracing::warn!(priority = %row.key, "Skipping unknown priority row"),
            }
        }

        tally
    }

    fn from_buckets(buckets: Vec<AggregateBucket>) -> Self {
        let mut tally = Self::default();
        let mut response_weighted = (0.0_f64, 0_u64);
        let mut resolution_weighted = (0.0_f64, 0_u64);

        for bucket in buckets {
            add_count(&mut tally.total, bucket.count);
            add_count(&mut tally.escalated, bucket.escalated_count);
            add_count(&mut tally.overdue, bucket.overdue_count);

            match TicketStatus::from_str_db(&bucket.status) {
                Ok(status) => add_count(tally.by_status.entry(status).or_default(), bucket.count),
                Err(_) => tracing::warn!(status = %bucket.status, "Unknown status in bucket"),
            }
            match TicketCategory::from_str_db(&bucket.category) {
                Ok(category) => add_count(tally.by_category.entry(category).or_default(), bucket.count),
                Err(_) => tracing::warn!(category = %bucket.category, "Unknown category in bucket"),
            }
            match TicketPriority::from_str_db(&bucket.priority) {
                Ok(priority) => add_count(tally.by_priority.entry(priority).or_default(), bucket.count),
                Err(_) => tracing::warn!(priority = %bucket.priority, "Unknown priority in bucket"),
            }

            if let Some(avg) = bucket.avg_first_response_time.filter(|a| a.is_finite()) {
                response_weighted.0 += avg * bucket.count as f64;
                add_count(&mut response_weighted.1, bucket.count);
            }
            if let Some(avg) = bucket.avg_resolution_time.filter(|a| a.is_finite()) {
                resolution_weighted.0 += avg * bucket.count as f64;
                add_count(&mut resolution_weighted.1, bucket.count);
            }
        }

        if response_weighted.1 > 0 {
            tally.avg_response = response_weighted.0 / response_weighted.1 as f64;
        }
        if resolution_weighted.1 > 0 {
            tally.avg_resolution = resolution_weighted.0 / resolution_weighted.1 as f64;
        }

        tally
    }

    fn finish(self) -> TicketStats {
        let total = self.total;
        let status = |s: TicketStatus| self.by_status.get(&s).copied().unwrap_or(0);

        let category_stats = TicketCategory::ALL
            .into_iter()
            .map(|category| {
                let count = self.by_category.get(&category).copied().unwrap_or(0);
                CategoryStat {
                    category,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();
        let priority_stats = TicketPriority::ALL
            .into_iter()
            .map(|priority| {
                let count = self.by_priority.get(&priority).copied().unwrap_or(0);
                PriorityStat {
                    priority,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect();

        TicketStats {
            total_tickets: total,
            open_tickets: status(TicketStatus::Open),
            in_progress_tickets: status(TicketStatus::InProgress),
            waiting_user_tickets: status(TicketStatus::WaitingUser),
            waiting_admin_tickets: status(TicketStatus::WaitingAdmin),
            resolved_tickets: status(TicketStatus::Resolved),
            closed_tickets: status(TicketStatus::Closed),
            cancelled_tickets: status(TicketStatus::Cancelled),
            escalated_tickets: self.escalated,
            overdue_tickets: self.overdue,
            avg_response_time: round2(self.avg_response),
            avg_resolution_time: round2(self.avg_resolution),
            category_stats,
            priority_stats,
        }
    }
}

/// Reduce an already-classified payload to [`TicketStats`].
pub fn normalize_payload(payload: ReportPayload) -> TicketStats {
    let tally = match payload {
        ReportPayload::Flat(flat) => {
            Tally::from_summary(flat.summary, flat.category_stats, flat.priority_stats)
        }
        ReportPayload::Envelope(envelope) => Tally::from_summary(
            envelope.stats,
            envelope.category_stats,
            envelope.priority_stats,
        ),
        ReportPayload::Buckets(buckets) => Tally::from_buckets(buckets),
        ReportPayload::Unknown => {
            tracing::warn!("Unrecognised statistics payload, falling back to zero record");
            Tally::default()
        }
    };
    tally.finish()
}

/// Decode and normalize a raw reporting payload. Never fails.
pub fn normalize_stats(raw: &serde_json::Value) -> TicketStats {
    let payload = ReportPayload::classify(raw);
    tracing::debug!(shape = payload.shape_name(), "Normalizing statistics payload");
    normalize_payload(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
