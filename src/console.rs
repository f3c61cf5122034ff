use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::{RegistryError, SessionError};
use crate::models::{Category, ComplaintStatus, Role};
use crate::report;
use crate::session::Session;

const DEFAULT_REPORT_PATH: &str = "grievance_report.md";

const STUDENT_COMMANDS: &str = "submit, track, history, profile, passwd, email, logout, quit";
const ADMIN_COMMANDS: &str = "list, update, report, export, profile, passwd, email, logout, quit";
const SUPPORT_CONTACT: &str = "support@campuscure.com";

/// Line-oriented front end: one command per cycle, then one line per form field.
pub struct Console<'a, R, W> {
    input: R,
    output: W,
    session: &'a mut Session,
    credentials: &'a mut CredentialStore,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        session: &'a mut Session,
        credentials: &'a mut CredentialStore,
    ) -> Self {
        Self {
            input,
            output,
            session,
            credentials,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "CampusCure grievance desk. Type 'help' for commands.")?;

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                break;
            };
            let command = line.trim().to_ascii_lowercase();
            if command.is_empty() {
                continue;
            }

            let escalated = self.session.begin_cycle(Utc::now());
            if escalated > 0 {
                debug!(escalated, "escalation sweep");
            }

            match command.as_str() {
                "quit" | "exit" => break,
                "help" => self.help()?,
                "login" => self.login()?,
                "logout" => self.logout()?,
                "submit" => self.submit()?,
                "track" => self.track()?,
                "history" => self.history()?,
                "profile" => self.profile()?,
                "passwd" => self.passwd()?,
                "email" => self.email()?,
                "list" => self.list()?,
                "update" => self.update()?,
                "report" => self.report()?,
                "export" => self.export()?,
                other => self.say(&format!("Unknown command: {other} (type 'help')"))?,
            }
        }

        writeln!(self.output, "Goodbye.")?;
        Ok(())
    }

    fn help(&mut self) -> anyhow::Result<()> {
        let commands = match self.session.user().map(|user| user.role) {
            None => "login, quit",
            Some(Role::Student) => STUDENT_COMMANDS,
            Some(Role::Admin) => ADMIN_COMMANDS,
        };
        self.say(&format!("Commands: {commands}"))
    }

    fn login(&mut self) -> anyhow::Result<()> {
        if let Some(user) = self.session.user() {
            let message = format!("Already logged in as {}. Log out first.", user.name);
            return self.say(&message);
        }

        let username = self.ask("Username")?;
        let password = self.ask("Password")?;
        let outcome = self
            .session
            .login(&username, &password, &mut *self.credentials)
            .map(|user| (user.role, user.name.clone()));

        match outcome {
            Ok((Role::Admin, _)) => self.say("Logged in as Admin"),
            Ok((Role::Student, name)) => self.say(&format!("Logged in as Student: {name}")),
            Err(err) => self.report_error(&err),
        }
    }

    fn logout(&mut self) -> anyhow::Result<()> {
        match self.session.logout() {
            Some(_) => self.say("Logged out."),
            None => self.say("Please log in first."),
        }
    }

    fn submit(&mut self) -> anyhow::Result<()> {
        if !self.allowed(Role::Student)? {
            return Ok(());
        }

        let name = self.ask("Student Name")?;
        let category = self.ask("Complaint Category (Academic/Hostel/Transport/Administration/Other)")?;
        let description = self.ask("Describe your Issue in Detail")?;
        let attachment = self.ask("Optional: attachment file name (jpg/png)")?;

        let category = if category.trim().is_empty() {
            Category::Academic
        } else {
            match category.parse::<Category>() {
                Ok(category) => category,
                Err(err) => return self.say(&format!("{err}")),
            }
        };

        let attachment = Some(attachment.as_str()).filter(|name| !name.trim().is_empty());
        let outcome = self
            .session
            .submit(&name, category, &description, attachment)
            .map(|complaint| complaint.id.clone());

        match outcome {
            Ok(id) => self.say(&format!("Complaint Submitted! Your ID is {id}")),
            Err(SessionError::Validation(_)) => self.say("Please fill all fields!"),
            Err(err) => self.report_error(&err),
        }
    }

    fn track(&mut self) -> anyhow::Result<()> {
        if !self.allowed(Role::Student)? {
            return Ok(());
        }

        let id = self.ask("Enter Complaint ID")?;
        if id.trim().is_empty() {
            return Ok(());
        }

        let card = match self.session.track(&id) {
            Ok(Some(complaint)) => report::render_card(complaint, Utc::now()),
            Ok(None) => return self.say("Invalid Complaint ID"),
            Err(err) => return self.report_error(&err),
        };
        self.say(card.trim_end())
    }

    fn history(&mut self) -> anyhow::Result<()> {
        let rendered = match self.session.history() {
            Ok(history) if history.is_empty() => None,
            Ok(history) => Some(report::render_table(history)),
            Err(err) => return self.report_error(&err),
        };

        match rendered {
            Some(table) => self.say(table.trim_end()),
            None => self.say("No grievances submitted yet."),
        }
    }

    fn profile(&mut self) -> anyhow::Result<()> {
        let Some(user) = self.session.user().cloned() else {
            return self.say("Please log in first.");
        };

        self.say(&format!("Name: {}", user.name))?;
        self.say(&format!("Role: {}", user.role))?;
        if user.role == Role::Student {
            self.say("Grievance History:")?;
            self.history()?;
        }
        self.say(&format!("Help & Support: Contact {SUPPORT_CONTACT}"))
    }

    // No account record holds an email address; the change is acknowledged only.
    fn email(&mut self) -> anyhow::Result<()> {
        if self.session.user().is_none() {
            return self.say("Please log in first.");
        }

        let email = self.ask("Enter New Email")?;
        if email.trim().is_empty() {
            self.say("Please enter a valid email")
        } else {
            self.say("Email Updated Successfully (Demo Mode)")
        }
    }

    fn passwd(&mut self) -> anyhow::Result<()> {
        let Some(user) = self.session.user().cloned() else {
            return self.say("Please log in first.");
        };

        // Login trims, so stored passwords are trimmed too.
        let new_password = self.ask("Enter New Password")?.trim().to_string();
        let confirm = self.ask("Confirm Password")?.trim().to_string();
        if new_password.is_empty() || new_password != confirm {
            return self.say("Passwords do not match");
        }

        match user.role {
            // Students have no stored credentials.
            Role::Student => self.say("Password Updated Successfully (Demo Mode)"),
            Role::Admin => match self.credentials.set_password(&user.name, &new_password) {
                Ok(()) => self.say("Password Updated Successfully"),
                Err(err) => self.report_error(&SessionError::from(err)),
            },
        }
    }

    fn list(&mut self) -> anyhow::Result<()> {
        let rendered = match self.session.complaints() {
            Ok([]) => None,
            Ok(complaints) => Some(report::render_table(complaints)),
            Err(err) => return self.report_error(&err),
        };

        match rendered {
            Some(table) => self.say(table.trim_end()),
            None => self.say("No complaints available yet."),
        }
    }

    fn update(&mut self) -> anyhow::Result<()> {
        if !self.allowed(Role::Admin)? {
            return Ok(());
        }
        if self.session.complaints()?.is_empty() {
            return self.say("No complaints available yet.");
        }

        let id = self.ask("Select Complaint ID")?;
        let status = self.ask("Update Status (Pending/In Review/Resolved/Escalated)")?;
        let remark = self.ask("Admin Remark")?;

        let status = match status.parse::<ComplaintStatus>() {
            Ok(status) => status,
            Err(err) => return self.say(&format!("{err}")),
        };

        let outcome = self.session.update(&id, status, &remark).map(|_| ());
        match outcome {
            Ok(()) => self.say("Updated Successfully!"),
            Err(SessionError::Registry(RegistryError::NotFound(_))) => {
                self.say("Invalid Complaint ID")
            }
            Err(err) => self.report_error(&err),
        }
    }

    fn report(&mut self) -> anyhow::Result<()> {
        if !self.allowed(Role::Admin)? {
            return Ok(());
        }

        let path = self.ask(&format!("Report path [{DEFAULT_REPORT_PATH}]"))?;
        let path = if path.trim().is_empty() {
            PathBuf::from(DEFAULT_REPORT_PATH)
        } else {
            PathBuf::from(path.trim())
        };

        let report = report::build_report(self.session.complaints()?, Utc::now());
        match std::fs::write(&path, report) {
            Ok(()) => self.say(&format!("Report written to {}.", path.display())),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "report not written");
                self.say(&format!("Could not write report to {}: {err}", path.display()))
            }
        }
    }

    fn export(&mut self) -> anyhow::Result<()> {
        let json = match self.session.complaints() {
            Ok(complaints) => serde_json::to_string_pretty(complaints)?,
            Err(err) => return self.report_error(&err),
        };
        self.say(&json)
    }

    /// Writes the refusal and returns false when the current user lacks `role`.
    fn allowed(&mut self, role: Role) -> anyhow::Result<bool> {
        let refusal = match self.session.user() {
            None => SessionError::NotLoggedIn,
            Some(user) if user.role != role => SessionError::Forbidden(role),
            Some(_) => return Ok(true),
        };
        self.report_error(&refusal)?;
        Ok(false)
    }

    fn report_error(&mut self, err: &SessionError) -> anyhow::Result<()> {
        let message = match err {
            SessionError::NotLoggedIn => "Please log in first.".to_string(),
            SessionError::Forbidden(role) => format!("Only {role} accounts can do that."),
            other => other.to_string(),
        };
        self.say(&message)
    }

    fn ask(&mut self, label: &str) -> anyhow::Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        Ok(self.read_line()?.unwrap_or_default())
    }

    fn say(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Invalid UTF-8 is replaced rather than ending the session.
    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::BootstrapAdmin;
    use crate::lifecycle::TransitionPolicy;
    use std::io::Cursor;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        session: Session,
        credentials: CredentialStore,
    }

    impl Harness {
        fn new(policy: TransitionPolicy) -> Self {
            let dir = TempDir::new().unwrap();
            let bootstrap = BootstrapAdmin {
                username: "admin".to_string(),
                password: "admin123".to_string(),
            };
            let credentials =
                CredentialStore::open_or_init(&dir.path().join("admin_users.csv"), &bootstrap)
                    .unwrap();
            Self {
                dir,
                session: Session::new(policy),
                credentials,
            }
        }

        fn run(&mut self, script: &str) -> String {
            self.run_bytes(script.as_bytes())
        }

        fn run_bytes(&mut self, script: &[u8]) -> String {
            let mut output = Vec::new();
            Console::new(
                Cursor::new(script.to_vec()),
                &mut output,
                &mut self.session,
                &mut self.credentials,
            )
            .run()
            .unwrap();
            String::from_utf8(output).unwrap()
        }
    }

    #[test]
    fn student_submits_and_tracks() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run(
            "login\nravi kumar\npw\n\
             submit\nRavi Kumar\nhostel\nURGENT: no water in hostel\n\n\
             track\nCMP001\n\
             track\nCMP009\n\
             quit\n",
        );

        assert!(output.contains("Logged in as Student: Ravi Kumar"));
        assert!(output.contains("Complaint Submitted! Your ID is CMP001"));
        assert!(output.contains("Status: Pending"));
        assert!(output.contains("Priority: High"));
        assert!(output.contains("Admin Remark: Not Reviewed Yet"));
        assert!(output.contains("Invalid Complaint ID"));
        assert!(output.ends_with("Goodbye.\n"));
    }

    #[test]
    fn incomplete_submission_is_rejected() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\nravi\npw\nsubmit\n\nOther\nwifi down\n\n");

        assert!(output.contains("Please fill all fields!"));
        assert_eq!(harness.session.history().unwrap().len(), 0);
    }

    #[test]
    fn blank_login_is_reported() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\n\nsecret\nhistory\n");

        assert!(output.contains("Enter both username and password"));
        assert!(output.contains("Please log in first."));
    }

    #[test]
    fn admin_updates_complaint_and_student_sees_it() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run(
            "login\nmeera\npw\n\
             submit\nMeera\nAcademic\nmarks missing\nmarksheet.png\n\
             logout\n\
             login\nadmin\nadmin123\n\
             update\nCMP001\nResolved\nFixed\n\
             update\nCMP404\nResolved\nFixed\n\
             list\n\
             logout\n\
             login\nmeera\npw\n\
             track\nCMP001\n\
             profile\n",
        );

        assert!(output.contains("Logged in as Admin"));
        assert!(output.contains("Updated Successfully!"));
        assert!(output.contains("Invalid Complaint ID"));
        assert!(output.contains("marksheet.png"));
        assert!(output.contains("Status: Resolved"));
        assert!(output.contains("Admin Remark: Fixed"));
        assert!(output.contains("Name: Meera"));
        assert!(output.contains("Role: Student"));
    }

    #[test]
    fn strict_policy_surfaces_rejected_transition() {
        let mut harness = Harness::new(TransitionPolicy::Strict);
        let output = harness.run(
            "login\nravi\npw\nsubmit\nRavi\nHostel\ntap\n\nlogout\n\
             login\nadmin\nadmin123\n\
             update\nCMP001\nResolved\nFixed\n\
             update\nCMP001\nPending\nreopen\n",
        );

        assert!(output.contains("Updated Successfully!"));
        assert!(output.contains("invalid status transition: Resolved -> Pending"));
    }

    #[test]
    fn roles_are_enforced() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\nravi\npw\nlist\nlogout\nlogin\nadmin\nadmin123\nsubmit\n");

        assert!(output.contains("Only Admin accounts can do that."));
        assert!(output.contains("Only Student accounts can do that."));
    }

    #[test]
    fn admin_empty_views() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\nadmin\nadmin123\nlist\nupdate\nexport\n");

        assert_eq!(output.matches("No complaints available yet.").count(), 2);
        assert!(output.contains("[]"));
    }

    #[test]
    fn admin_writes_report_and_exports_json() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let report_path = harness.dir.path().join("report.md");
        let script = format!(
            "login\nravi\npw\nsubmit\nRavi\nTransport\nurgent bus breakdown\n\nlogout\n\
             login\nadmin\nadmin123\nreport\n{}\nexport\n",
            report_path.display()
        );
        let output = harness.run(&script);

        assert!(output.contains("Report written to"));
        let report = std::fs::read_to_string(&report_path).unwrap();
        assert!(report.starts_with("# CampusCure Grievance Report"));
        assert!(report.contains("- CMP001 [Transport] Ravi (Pending): urgent bus breakdown"));
        assert!(output.contains("\"id\": \"CMP001\""));
        assert!(output.contains("\"priority\": \"High\""));
    }

    #[test]
    fn admin_password_change_is_persisted() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run(
            "login\nadmin\nadmin123\npasswd\nnewpass\nnewpass\nlogout\n\
             login\nadmin\nadmin123\nlogout\n\
             login\nadmin\nnewpass\n",
        );

        assert!(output.contains("Password Updated Successfully\n"));
        assert!(output.contains("Logged in as Student: Admin"));
        assert_eq!(output.matches("Logged in as Admin").count(), 2);
    }

    #[test]
    fn student_password_change_is_demo_only() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\nravi\npw\npasswd\na\nb\npasswd\nx\nx\n");

        assert!(output.contains("Passwords do not match"));
        assert!(output.contains("Password Updated Successfully (Demo Mode)"));
    }

    #[test]
    fn failed_report_write_keeps_session_alive() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let missing = harness.dir.path().join("no_such_dir").join("report.md");
        let script = format!(
            "login\nravi\npw\nsubmit\nRavi\nHostel\ntap\n\nlogout\n\
             login\nadmin\nadmin123\nreport\n{}\nlist\n",
            missing.display()
        );
        let output = harness.run(&script);

        let failure = format!("Could not write report to {}", missing.display());
        let at = output.find(&failure).expect("write failure reported");
        assert!(output[at..].contains("CMP001"));
        assert!(output.ends_with("Goodbye.\n"));
        assert_eq!(harness.session.complaints().unwrap().len(), 1);
    }

    #[test]
    fn invalid_utf8_input_is_replaced() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let mut script = b"login\nravi\npw\nsubmit\nRavi\nHostel\nleaking tap\n\n".to_vec();
        script.extend_from_slice(b"submit\nRavi\nOther\ncaf\xe9 broken\n\nhistory\n");
        let output = harness.run_bytes(&script);

        assert!(output.contains("Complaint Submitted! Your ID is CMP002"));
        assert!(output.ends_with("Goodbye.\n"));
        let history = harness.session.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].description, "caf\u{fffd} broken");
    }

    #[test]
    fn profile_shows_support_and_email_is_demo_only() {
        let mut harness = Harness::new(TransitionPolicy::Permissive);
        let output = harness.run("login\nravi\npw\nprofile\nemail\n\nemail\nravi@example.com\n");

        assert!(output.contains("No grievances submitted yet."));
        assert!(output.contains("Help & Support: Contact support@campuscure.com"));
        assert!(output.contains("Please enter a valid email"));
        assert!(output.contains("Email Updated Successfully (Demo Mode)"));
    }
}
