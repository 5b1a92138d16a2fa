//! `stockbook` admin tool: profile and backup housekeeping from the command line.

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{env, process::ExitCode};
use stockbook::{
    config::settings::{Settings, load_default_settings},
    core::{
        backup::BackupManager,
        profile::ProfileManager,
        report::{format_amount, inventory_summary},
        session::Session,
    },
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the password of a protected profile
const PASSWORD_ENV: &str = "STOCKBOOK_PASSWORD";

/// Profile and backup housekeeping for stockbook profiles.
#[derive(Parser, Debug)]
#[command(name = "stockbook", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List profiles, marking the last used one.
    Profiles,
    /// Create an empty profile.
    Create { name: String },
    /// Copy a profile's catalog into a new profile.
    Duplicate { source: String, target: String },
    /// Rename a profile.
    Rename { old: String, new: String },
    /// Delete a profile and its backups.
    Delete { name: String },
    /// List a profile's backups.
    Backups { profile: String },
    /// Back up a profile, named after the current time unless a name is given.
    Backup { profile: String, name: Option<String> },
    /// Restore a profile from one of its backups.
    Restore { profile: String, backup: String },
    /// Print stock levels.
    Inventory { profile: String },
}

/// Opens `name` in a session, unlocking it from the environment when it is protected.
async fn open_session(profiles: ProfileManager, name: &str) -> Result<Session> {
    let mut session = Session::new(profiles);
    session.open_profile(name).await?;
    if session.database().is_err() {
        let password = env::var(PASSWORD_ENV).map_err(|_| Error::SessionLocked)?;
        session.unlock(&password)?;
    }
    Ok(session)
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    let profiles = ProfileManager::new(&settings.profiles_dir);

    match command {
        Command::Profiles => {
            let last = profiles.last_used_profile()?;
            for name in profiles.list_profiles()? {
                let marker = if last.as_deref() == Some(name.as_str()) { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        Command::Create { name } => {
            let config = profiles.create_profile(&name).await?;
            println!("created {}", config.name);
        }
        Command::Duplicate { source, target } => {
            let config = profiles.duplicate_profile(&source, &target).await?;
            println!("created {} from {source}", config.name);
        }
        Command::Rename { old, new } => {
            let config = profiles.rename_profile(&old, &new)?;
            println!("renamed {old} to {}", config.name);
        }
        Command::Delete { name } => {
            profiles.delete_profile(&name)?;
            println!("deleted {name}");
        }
        Command::Backups { profile } => {
            if !profiles.exists(&profile) {
                return Err(Error::NotFound {
                    entity: "profile",
                    key: profile,
                });
            }
            for backup in BackupManager::new(profiles.profile_dir(&profile)).list_backups()? {
                println!("{}", backup.name);
            }
        }
        Command::Backup { profile, name } => {
            let mut session = open_session(profiles, &profile).await?;
            let backup = session.create_backup(name.as_deref()).await?;
            session.close_profile().await?;
            println!("created backup {}", backup.name);
        }
        Command::Restore { profile, backup } => {
            let mut session = open_session(profiles, &profile).await?;
            session.restore_backup(&backup).await?;
            session.close_profile().await?;
            println!("restored {profile} from {backup}");
        }
        Command::Inventory { profile } => {
            let mut session = open_session(profiles, &profile).await?;
            let summary =
                inventory_summary(session.database()?, settings.low_stock_threshold).await?;
            for line in &summary.lines {
                let flag = if line.low_stock { "!" } else { " " };
                println!(
                    "{flag} {:<30} {:>8} {:>12}",
                    line.name,
                    line.quantity,
                    format_amount(line.stock_value)
                );
            }
            println!(
                "  {:<30} {:>8} {:>12}",
                "total",
                summary.total_units,
                format_amount(summary.total_value)
            );
            session.close_profile().await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenv().ok();

    let settings = match load_default_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    info!("Using profiles folder {}", settings.profiles_dir.display());

    if let Err(e) = run(cli.command, &settings).await {
        error!("{e}");
        if e.is_retryable() {
            eprintln!("{e} (close other programs using the profile and retry)");
        } else {
            eprintln!("{e}");
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
