use chrono::{DateTime, Utc};
use tracing::{info, info_span, Span};
use uuid::Uuid;

use crate::credentials::Authenticator;
use crate::error::SessionError;
use crate::lifecycle::TransitionPolicy;
use crate::models::{Category, Complaint, ComplaintStatus, Role, User};
use crate::registry::Registry;

/// Everything one interactive user owns for the life of the process.
///
/// The registry outlives logins: logging out and back in under the same
/// name shows the same history.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    span: Span,
    registry: Registry,
    user: Option<User>,
}

impl Session {
    pub fn new(policy: TransitionPolicy) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            span: info_span!("session", %id),
            registry: Registry::new(policy),
            user: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Known admins get the admin role; any other name is let in as a student.
    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        authenticator: &mut dyn Authenticator,
    ) -> Result<&User, SessionError> {
        let _entered = self.span.enter();
        // Trimmed before title-casing, so padded input yields a clean display name.
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let user = if authenticator.verify(username, password)? {
            User {
                name: username.to_string(),
                role: Role::Admin,
            }
        } else {
            User {
                name: title_case(username),
                role: Role::Student,
            }
        };

        info!(name = %user.name, role = %user.role, "logged in");
        Ok(self.user.insert(user))
    }

    pub fn logout(&mut self) -> Option<User> {
        let _entered = self.span.enter();
        let user = self.user.take();
        if let Some(user) = &user {
            info!(name = %user.name, "logged out");
        }
        user
    }

    /// Runs once at the top of every interaction cycle.
    pub fn begin_cycle(&mut self, now: DateTime<Utc>) -> usize {
        let _entered = self.span.enter();
        self.registry.sweep_escalations(now)
    }

    pub fn submit(
        &mut self,
        student_name: &str,
        category: Category,
        description: &str,
        attachment_name: Option<&str>,
    ) -> Result<&Complaint, SessionError> {
        self.require(Role::Student)?;
        let _entered = self.span.enter();
        Ok(self
            .registry
            .create(student_name, category, description, attachment_name)?)
    }

    pub fn track(&self, id: &str) -> Result<Option<&Complaint>, SessionError> {
        self.require(Role::Student)?;
        Ok(self.registry.find_by_id(id.trim()))
    }

    /// Complaints filed under the logged-in student's display name.
    pub fn history(&self) -> Result<Vec<&Complaint>, SessionError> {
        let user = self.require(Role::Student)?;
        Ok(self.registry.list_by_student(&user.name))
    }

    pub fn update(
        &mut self,
        id: &str,
        status: ComplaintStatus,
        remark: &str,
    ) -> Result<&Complaint, SessionError> {
        self.require(Role::Admin)?;
        let _entered = self.span.enter();
        Ok(self.registry.update(id.trim(), status, remark)?)
    }

    pub fn complaints(&self) -> Result<&[Complaint], SessionError> {
        self.require(Role::Admin)?;
        Ok(self.registry.all())
    }

    fn require(&self, role: Role) -> Result<&User, SessionError> {
        match &self.user {
            None => Err(SessionError::NotLoggedIn),
            Some(user) if user.role != role => Err(SessionError::Forbidden(role)),
            Some(user) => Ok(user),
        }
    }
}

/// Capitalizes the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut at_word_start = true;

    for ch in input.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = true;
        }
    }

    output
}
