use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

mod config;
mod console;
mod credentials;
mod error;
mod lifecycle;
mod models;
mod registry;
mod report;
mod session;
mod sla;

use config::{Settings, DEFAULT_CREDENTIALS_PATH};
use credentials::CredentialStore;

#[derive(Parser)]
#[command(name = "campuscure")]
#[command(about = "Campus grievance desk with SLA escalation", long_about = None)]
struct Cli {
    /// Admin credential file (username,password_hash)
    #[arg(
        long,
        global = true,
        env = "CAMPUSCURE_CREDENTIALS",
        default_value = DEFAULT_CREDENTIALS_PATH
    )]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive grievance desk session
    Session {
        /// Reject admin status changes that move a complaint backwards
        #[arg(long)]
        strict_transitions: bool,
    },
    /// Create the credential file with the bootstrap admin if it is missing
    InitCredentials,
    /// Add an admin account or replace its password
    SetAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Session { strict_transitions } => {
            let settings = Settings::new(cli.credentials, strict_transitions);
            let mut store = open_store(&settings)?;
            let mut session = session::Session::new(settings.transition_policy);
            info!(
                session = %session.id(),
                policy = ?settings.transition_policy,
                "session started"
            );

            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            console::Console::new(stdin.lock(), stdout.lock(), &mut session, &mut store).run()?;
        }
        Commands::InitCredentials => {
            let settings = Settings::new(cli.credentials, false);
            let store = open_store(&settings)?;
            println!(
                "Credential file ready at {} ({} admin accounts).",
                store.path().display(),
                store.usernames().count()
            );
        }
        Commands::SetAdmin { username, password } => {
            let settings = Settings::new(cli.credentials, false);
            let mut store = open_store(&settings)?;
            store
                .set_password(&username, &password)
                .with_context(|| format!("failed to store credentials for {username}"))?;
            println!("Admin {} saved to {}.", username.trim(), store.path().display());
        }
    }

    Ok(())
}

fn open_store(settings: &Settings) -> anyhow::Result<CredentialStore> {
    CredentialStore::open_or_init(&settings.credentials_path, &settings.bootstrap_admin)
        .with_context(|| {
            format!(
                "failed to open credential file {}",
                settings.credentials_path.display()
            )
        })
}
