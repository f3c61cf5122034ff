use thiserror::Error;

use crate::models::{ComplaintStatus, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),
}

/// Rejected submission; nothing is recorded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("complaint {0} not found")]
    NotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is malformed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("username must not be empty")]
    EmptyUsername,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Enter both username and password")]
    MissingCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("this action requires the {0} role")]
    Forbidden(Role),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}
