//! Admin credential file.
//!
//! A flat CSV of `username,password_hash` rows. New hashes are Argon2id PHC
//! strings. Rows written by older installs carry a bare hex SHA-256 digest;
//! those still verify, and are re-hashed with Argon2id the first time they
//! do.

use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::CredentialError;

/// Anything that can answer "is this an admin login?".
pub trait Authenticator {
    fn verify(&mut self, username: &str, password: &str) -> Result<bool, CredentialError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CredentialRow {
    username: String,
    password_hash: String,
}

/// Account written to a fresh credential file.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    rows: Vec<CredentialRow>,
}

impl CredentialStore {
    /// Loads the file, creating it with the bootstrap admin if it does not exist.
    pub fn open_or_init(path: &Path, bootstrap: &BootstrapAdmin) -> Result<Self, CredentialError> {
        if path.exists() {
            return Self::load(path);
        }

        info!(path = %path.display(), username = %bootstrap.username, "creating credential file");
        let mut store = Self {
            path: path.to_path_buf(),
            rows: Vec::new(),
        };
        store.set_password(&bootstrap.username, &bootstrap.password)?;
        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();

        for result in reader.deserialize::<CredentialRow>() {
            rows.push(result?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.username.as_str())
    }

    /// Inserts or replaces an admin account and writes the file.
    pub fn set_password(&mut self, username: &str, password: &str) -> Result<(), CredentialError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }

        let password_hash = hash_password(password)?;
        let mut rows = self.rows.clone();
        match rows.iter_mut().find(|row| row.username == username) {
            Some(row) => row.password_hash = password_hash,
            None => rows.push(CredentialRow {
                username: username.to_string(),
                password_hash,
            }),
        }

        self.commit(rows)
    }

    /// Writes `rows` and only then adopts them, so memory never runs ahead of the file.
    fn commit(&mut self, rows: Vec<CredentialRow>) -> Result<(), CredentialError> {
        write_rows(&self.path, &rows)?;
        self.rows = rows;
        Ok(())
    }
}

fn write_rows(path: &Path, rows: &[CredentialRow]) -> Result<(), CredentialError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl Authenticator for CredentialStore {
    fn verify(&mut self, username: &str, password: &str) -> Result<bool, CredentialError> {
        let Some(index) = self.rows.iter().position(|row| row.username == username) else {
            return Ok(false);
        };

        let stored = self.rows[index].password_hash.clone();
        if is_legacy_digest(&stored) {
            if legacy_digest(password) != stored.to_ascii_lowercase() {
                return Ok(false);
            }
            warn!(username, "upgrading unsalted SHA-256 credential to Argon2id");
            let upgraded = hash_password(password).and_then(|password_hash| {
                let mut rows = self.rows.clone();
                rows[index].password_hash = password_hash;
                self.commit(rows)
            });
            // The password matched; a failed upgrade leaves the legacy row for next time.
            if let Err(err) = upgraded {
                warn!(username, error = %err, "credential upgrade not saved");
            }
            return Ok(true);
        }

        verify_password(password, &stored)
    }
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let Ok(parsed) = PasswordHash::new(hash) else {
        warn!("credential row has an unreadable hash; treating as mismatch");
        return Ok(false);
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hash(e.to_string())),
    }
}

fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_legacy_digest(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}
