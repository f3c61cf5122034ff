use std::path::PathBuf;

use crate::credentials::BootstrapAdmin;
use crate::lifecycle::TransitionPolicy;

pub const DEFAULT_CREDENTIALS_PATH: &str = "admin_users.csv";
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials_path: PathBuf,
    /// Written to the credential file only when it does not exist yet.
    pub bootstrap_admin: BootstrapAdmin,
    pub transition_policy: TransitionPolicy,
}

impl Settings {
    pub fn new(credentials_path: PathBuf, strict_transitions: bool) -> Self {
        Self {
            credentials_path,
            bootstrap_admin: Self::bootstrap_from_env(),
            transition_policy: if strict_transitions {
                TransitionPolicy::Strict
            } else {
                TransitionPolicy::Permissive
            },
        }
    }

    fn bootstrap_from_env() -> BootstrapAdmin {
        BootstrapAdmin {
            username: std::env::var("CAMPUSCURE_ADMIN_USERNAME")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.into()),
            password: std::env::var("CAMPUSCURE_ADMIN_PASSWORD")
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_flag_selects_policy() {
        let settings = Settings::new(PathBuf::from(DEFAULT_CREDENTIALS_PATH), true);
        assert_eq!(settings.transition_policy, TransitionPolicy::Strict);

        let settings = Settings::new(PathBuf::from(DEFAULT_CREDENTIALS_PATH), false);
        assert_eq!(settings.transition_policy, TransitionPolicy::Permissive);
    }
}
