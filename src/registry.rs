use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, ValidationError};
use crate::lifecycle::{self, TransitionPolicy};
use crate::models::{Category, Complaint, ComplaintStatus, DEFAULT_REMARK};
use crate::sla;

/// In-memory complaint table for one session, in submission order.
#[derive(Debug, Default)]
pub struct Registry {
    complaints: Vec<Complaint>,
    policy: TransitionPolicy,
}

impl Registry {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            complaints: Vec::new(),
            policy,
        }
    }

    pub fn create(
        &mut self,
        student_name: &str,
        category: Category,
        description: &str,
        attachment_name: Option<&str>,
    ) -> Result<&Complaint, ValidationError> {
        self.create_at(student_name, category, description, attachment_name, Utc::now())
    }

    pub fn create_at(
        &mut self,
        student_name: &str,
        category: Category,
        description: &str,
        attachment_name: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> Result<&Complaint, ValidationError> {
        if student_name.trim().is_empty() {
            return Err(ValidationError::MissingField("student name"));
        }
        if description.trim().is_empty() {
            return Err(ValidationError::MissingField("description"));
        }

        // Ids come from the table size; nothing is ever removed, so they never repeat.
        let id = format!("CMP{:03}", self.complaints.len() + 1);
        let complaint = Complaint {
            id,
            student_name: student_name.to_string(),
            category,
            description: description.to_string(),
            priority: sla::derive_priority(description),
            status: ComplaintStatus::Pending,
            admin_remark: DEFAULT_REMARK.to_string(),
            submitted_at,
            sla_deadline: sla::sla_deadline(submitted_at),
            attachment_name: attachment_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        };

        debug!(
            id = %complaint.id,
            category = %complaint.category,
            priority = %complaint.priority,
            "complaint recorded"
        );
        self.complaints.push(complaint);
        Ok(&self.complaints[self.complaints.len() - 1])
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Complaint> {
        self.complaints.iter().find(|complaint| complaint.id == id)
    }

    pub fn update(
        &mut self,
        id: &str,
        new_status: ComplaintStatus,
        new_remark: &str,
    ) -> Result<&Complaint, RegistryError> {
        let policy = self.policy;
        let Some(complaint) = self.complaints.iter_mut().find(|complaint| complaint.id == id)
        else {
            warn!(id, "update for unknown complaint");
            return Err(RegistryError::NotFound(id.to_string()));
        };

        lifecycle::validate_transition(complaint.status, new_status, policy)?;

        info!(id, from = %complaint.status, to = %new_status, "complaint updated");
        complaint.status = new_status;
        complaint.admin_remark = new_remark.to_string();
        Ok(complaint)
    }

    pub fn list_by_student(&self, student_name: &str) -> Vec<&Complaint> {
        self.complaints
            .iter()
            .filter(|complaint| complaint.student_name == student_name)
            .collect()
    }

    pub fn all(&self) -> &[Complaint] {
        &self.complaints
    }

    /// Moves every open complaint past its deadline to `Escalated`.
    ///
    /// Returns how many records changed; a second call with the same `now`
    /// returns zero.
    pub fn sweep_escalations(&mut self, now: DateTime<Utc>) -> usize {
        let mut escalated = 0usize;

        for complaint in self.complaints.iter_mut() {
            if !sla::is_overdue(complaint, now) {
                continue;
            }

            info!(
                id = %complaint.id,
                from = %complaint.status,
                deadline = %complaint.sla_deadline,
                "complaint escalated past SLA"
            );
            complaint.status = ComplaintStatus::Escalated;
            escalated += 1;
        }

        escalated
    }
}
