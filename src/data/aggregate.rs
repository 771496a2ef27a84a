//! Dashboard aggregation: summary counts and chart buckets.

use super::{ProgramRequest, ProgramStatus, StatusValue, Ticket};
use std::collections::HashMap;

/// Bucket label for tickets without a status.
pub const UNKNOWN_STATUS_LABEL: &str = "Desconocido";
/// Bucket key for program requests without a program type.
pub const OTHER_PROGRAM_LABEL: &str = "Otros";

/// Both collections as fetched by one dashboard poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub tickets: Vec<Ticket>,
    pub programs: Vec<ProgramRequest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_tickets: usize,
    pub pending_tickets: usize,
    pub total_programs: usize,
    pub pending_programs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

/// Counts grouped by key, in first-seen order.
///
/// The grouping key and the display label can differ (program types are
/// grouped as stored and displayed upper-cased).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    buckets: Vec<Bucket>,
    index: HashMap<String, usize>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, label: impl FnOnce() -> String) {
        match self.index.get(key) {
            Some(&idx) => self.buckets[idx].count += 1,
            None => {
                self.index.insert(key.to_string(), self.buckets.len());
                self.buckets.push(Bucket {
                    label: label(),
                    count: 1,
                });
            }
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Count for a display label (first matching bucket).
    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.count)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Tickets waiting on image validation or GPS verification.
pub fn pending_tickets(tickets: &[Ticket]) -> usize {
    tickets
        .iter()
        .filter(|t| t.status.is_some_and(|s| s.awaits_verification()))
        .count()
}

/// Program requests still in "Pendiente".
pub fn pending_programs(programs: &[ProgramRequest]) -> usize {
    programs
        .iter()
        .filter(|p| p.status == Some(ProgramStatus::Pending))
        .count()
}

pub fn ticket_status_histogram(tickets: &[Ticket]) -> Histogram {
    let mut histogram = Histogram::new();
    for ticket in tickets {
        let label = ticket
            .status
            .map(|s| s.as_str())
            .unwrap_or(UNKNOWN_STATUS_LABEL);
        histogram.add(label, || label.to_string());
    }
    histogram
}

pub fn program_type_histogram(programs: &[ProgramRequest]) -> Histogram {
    let mut histogram = Histogram::new();
    for program in programs {
        // Whitespace-only types were already read as absent, so they land in Otros too
        let key = program
            .program_type
            .as_deref()
            .unwrap_or(OTHER_PROGRAM_LABEL);
        histogram.add(key, || key.to_uppercase());
    }
    histogram
}

/// Everything the dashboard renders, derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub ticket_statuses: Histogram,
    pub program_types: Histogram,
}

impl DashboardSummary {
    pub fn compute(snapshot: &DashboardSnapshot) -> Self {
        Self {
            stats: DashboardStats {
                total_tickets: snapshot.tickets.len(),
                pending_tickets: pending_tickets(&snapshot.tickets),
                total_programs: snapshot.programs.len(),
                pending_programs: pending_programs(&snapshot.programs),
            },
            ticket_statuses: ticket_status_histogram(&snapshot.tickets),
            program_types: program_type_histogram(&snapshot.programs),
        }
    }
}
