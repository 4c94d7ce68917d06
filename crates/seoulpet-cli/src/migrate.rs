//! Schema migration commands backed by `sqlx-cli`.
//!
//! Every sub-command maps onto one `sqlx` invocation. The command line, its
//! stdout and its stderr are echoed; a non-zero exit status fails the command.

use anyhow::Context;
use clap::Subcommand;
use tokio::process::Command;

const SQLX_BIN: &str = "sqlx";

/// Revision accepted by `downgrade` to revert only the newest migration.
const PREVIOUS_REVISION: &str = "-1";

/// Sub-commands available under `migrate`.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum MigrateCommands {
    /// Create the database named by `DATABASE_URL`
    Init,
    /// Add a new reversible migration pair
    Create {
        /// Short description used in the migration file names
        message: String,
    },
    /// Apply every pending migration
    Upgrade,
    /// Revert migrations: `-1` undoes the newest one, a version reverts down to it
    Downgrade {
        #[arg(allow_hyphen_values = true)]
        revision: String,
    },
    /// List every migration with its state
    History,
    /// Show the newest applied migration
    Current,
    /// List migrations not yet applied
    Show,
}

/// Arguments passed to `sqlx` for `command`.
///
/// # Errors
///
/// Returns an error if a `downgrade` revision is neither `-1` nor a numeric
/// migration version, or a `create` message is blank.
pub(crate) fn sqlx_args(command: &MigrateCommands, source: &str) -> anyhow::Result<Vec<String>> {
    let migrate = |sub: &str| -> Vec<String> {
        vec![
            "migrate".to_string(),
            sub.to_string(),
            "--source".to_string(),
            source.to_string(),
        ]
    };

    let args = match command {
        MigrateCommands::Init => vec!["database".to_string(), "create".to_string()],
        MigrateCommands::Create { message } => {
            let message = message.trim();
            if message.is_empty() {
                anyhow::bail!("migration message must not be empty");
            }
            let mut args = migrate("add");
            args.push("-r".to_string());
            args.push(message.to_string());
            args
        }
        MigrateCommands::Upgrade => migrate("run"),
        MigrateCommands::Downgrade { revision } => {
            let mut args = migrate("revert");
            if revision != PREVIOUS_REVISION {
                if revision.is_empty() || !revision.chars().all(|c| c.is_ascii_digit()) {
                    anyhow::bail!(
                        "revision must be {PREVIOUS_REVISION} or a numeric migration version, got '{revision}'"
                    );
                }
                args.push("--target-version".to_string());
                args.push(revision.clone());
            }
            args
        }
        MigrateCommands::History | MigrateCommands::Current | MigrateCommands::Show => {
            migrate("info")
        }
    };
    Ok(args)
}

/// Newest `installed` line of `sqlx migrate info` output.
pub(crate) fn current_revision(info: &str) -> Option<&str> {
    info.lines()
        .rev()
        .map(str::trim)
        .find(|line| line.contains("/installed"))
}

/// Every `pending` line of `sqlx migrate info` output.
pub(crate) fn pending_migrations(info: &str) -> Vec<&str> {
    info.lines()
        .map(str::trim)
        .filter(|line| line.contains("/pending"))
        .collect()
}

/// Runs a `migrate` sub-command.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, `sqlx` cannot be launched,
/// or it exits unsuccessfully.
pub(crate) async fn run_migrate(command: &MigrateCommands, source: &str) -> anyhow::Result<()> {
    let args = sqlx_args(command, source)?;
    let stdout = run_sqlx(&args).await?;

    match command {
        MigrateCommands::Current => match current_revision(&stdout) {
            Some(line) => println!("current: {line}"),
            None => println!("current: no migrations applied"),
        },
        MigrateCommands::Show => {
            let pending = pending_migrations(&stdout);
            if pending.is_empty() {
                println!("no pending migrations");
            } else {
                println!("{} pending migration(s):", pending.len());
                for line in pending {
                    println!("  {line}");
                }
            }
        }
        _ => {
            if !stdout.trim().is_empty() {
                println!("{}", stdout.trim_end());
            }
        }
    }
    Ok(())
}

async fn run_sqlx(args: &[String]) -> anyhow::Result<String> {
    println!("running: {SQLX_BIN} {}", args.join(" "));
    tracing::debug!(?args, "invoking sqlx-cli");

    let output = Command::new(SQLX_BIN)
        .args(args)
        .output()
        .await
        .with_context(|| {
            format!(
                "failed to launch '{SQLX_BIN}'; install it with \
                 `cargo install sqlx-cli --no-default-features --features rustls,postgres`"
            )
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        eprintln!("{}", stderr.trim_end());
    }
    if !output.status.success() {
        anyhow::bail!("{SQLX_BIN} exited with {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &MigrateCommands) -> Vec<String> {
        sqlx_args(command, "migrations").expect("valid command")
    }

    #[test]
    fn init_creates_database() {
        assert_eq!(args(&MigrateCommands::Init), ["database", "create"]);
    }

    #[test]
    fn create_adds_reversible_migration() {
        let cmd = MigrateCommands::Create {
            message: " add clinic index ".to_string(),
        };
        assert_eq!(
            args(&cmd),
            ["migrate", "add", "--source", "migrations", "-r", "add clinic index"]
        );
    }

    #[test]
    fn create_rejects_blank_message() {
        let cmd = MigrateCommands::Create {
            message: "  ".to_string(),
        };
        assert!(sqlx_args(&cmd, "migrations").is_err());
    }

    #[test]
    fn upgrade_runs_pending_migrations() {
        assert_eq!(
            args(&MigrateCommands::Upgrade),
            ["migrate", "run", "--source", "migrations"]
        );
    }

    #[test]
    fn downgrade_minus_one_reverts_latest() {
        let cmd = MigrateCommands::Downgrade {
            revision: "-1".to_string(),
        };
        assert_eq!(args(&cmd), ["migrate", "revert", "--source", "migrations"]);
    }

    #[test]
    fn downgrade_to_version_passes_target() {
        let cmd = MigrateCommands::Downgrade {
            revision: "20261001000200".to_string(),
        };
        assert_eq!(
            args(&cmd),
            [
                "migrate",
                "revert",
                "--source",
                "migrations",
                "--target-version",
                "20261001000200"
            ]
        );
    }

    #[test]
    fn downgrade_rejects_non_numeric_revision() {
        let cmd = MigrateCommands::Downgrade {
            revision: "head".to_string(),
        };
        assert!(sqlx_args(&cmd, "migrations").is_err());
    }

    #[test]
    fn history_current_and_show_read_migrate_info() {
        for cmd in [
            MigrateCommands::History,
            MigrateCommands::Current,
            MigrateCommands::Show,
        ] {
            assert_eq!(args(&cmd), ["migrate", "info", "--source", "migrations"]);
        }
    }

    const INFO: &str = "\
20261001000100/installed create pet registrations
20261001000200/installed create pet clinics
20261001000300/pending create weather observations
20261001000400/pending create collection runs
";

    #[test]
    fn current_revision_is_last_installed_line() {
        assert_eq!(
            current_revision(INFO),
            Some("20261001000200/installed create pet clinics")
        );
        assert_eq!(current_revision(""), None);
    }

    #[test]
    fn pending_migrations_lists_pending_lines() {
        let pending = pending_migrations(INFO);
        assert_eq!(pending.len(), 2);
        assert!(pending[0].starts_with("20261001000300/pending"));
    }
}
