use chrono::{DateTime, Duration, Utc};

use crate::models::{Complaint, Priority};

pub const SLA_DAYS: i64 = 3;

const URGENT_MARKER: &str = "urgent";

pub fn sla_deadline(submitted_at: DateTime<Utc>) -> DateTime<Utc> {
    submitted_at + Duration::days(SLA_DAYS)
}

pub fn derive_priority(description: &str) -> Priority {
    if description.to_lowercase().contains(URGENT_MARKER) {
        Priority::High
    } else {
        Priority::Medium
    }
}

pub fn is_overdue(complaint: &Complaint, now: DateTime<Utc>) -> bool {
    complaint.status.is_open() && now > complaint.sla_deadline
}

/// Positive while the deadline is ahead, negative once it has passed.
pub fn time_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    deadline - now
}

pub fn describe_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = time_remaining(deadline, now);
    let magnitude = if remaining < Duration::zero() {
        -remaining
    } else {
        remaining
    };
    let days = magnitude.num_days();
    let hours = magnitude.num_hours() - days * 24;

    if remaining < Duration::zero() {
        format!("overdue by {days}d {hours}h")
    } else {
        format!("{days}d {hours}h left")
    }
}
