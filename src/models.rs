use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ParseError;

pub const DEFAULT_REMARK: &str = "Not Reviewed Yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Academic,
    Hostel,
    Transport,
    Administration,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Academic,
        Category::Hostel,
        Category::Transport,
        Category::Administration,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Academic => "Academic",
            Self::Hostel => "Hostel",
            Self::Transport => "Transport",
            Self::Administration => "Administration",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::UnknownCategory(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("High"),
            Self::Medium => f.write_str("Medium"),
        }
    }
}

/// Lifecycle state of a complaint.
///
/// `Pending` is the initial state. The escalation sweep only ever moves
/// open complaints (`Pending`, `InReview`) to `Escalated`; every other
/// change goes through an admin update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComplaintStatus {
    Pending,
    #[serde(rename = "In Review")]
    InReview,
    Resolved,
    Escalated,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InReview,
        ComplaintStatus::Resolved,
        ComplaintStatus::Escalated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InReview => "In Review",
            Self::Resolved => "Resolved",
            Self::Escalated => "Escalated",
        }
    }

    /// Whether the SLA clock still applies.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InReview)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        match wanted.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in review" | "in-review" | "in_review" | "inreview" => Ok(Self::InReview),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            _ => Err(ParseError::UnknownStatus(wanted.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Complaint {
    pub id: String,
    pub student_name: String,
    pub category: Category,
    pub description: String,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub admin_remark: String,
    pub submitted_at: DateTime<Utc>,
    pub sla_deadline: DateTime<Utc>,
    pub attachment_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("Admin"),
            Self::Student => f.write_str("Student"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub role: Role,
}
