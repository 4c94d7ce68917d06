use super::*;
use crate::collect::RangeArgs;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["seoulpet-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["seoulpet-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["seoulpet-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn collect_all_defaults_to_configured_range() {
    let cli = Cli::try_parse_from(["seoulpet-cli", "collect", "all"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            command: CollectCommands::All {
                range: RangeArgs {
                    start: None,
                    end: None
                },
                json: false
            }
        })
    ));
}

#[test]
fn collect_registrations_accepts_range_and_dry_run() {
    let cli = Cli::try_parse_from([
        "seoulpet-cli",
        "collect",
        "registrations",
        "--start",
        "1",
        "--end",
        "500",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            command: CollectCommands::Registrations {
                range: RangeArgs {
                    start: Some(1),
                    end: Some(500)
                },
                dry_run: true
            }
        })
    ));
}

#[test]
fn collect_rejects_non_numeric_start() {
    let result = Cli::try_parse_from(["seoulpet-cli", "collect", "weather", "--start", "one"]);
    assert!(result.is_err());
}

#[test]
fn collect_rejects_unknown_source() {
    let result = Cli::try_parse_from(["seoulpet-cli", "collect", "hospitals"]);
    assert!(result.is_err());
}

#[test]
fn migrate_create_takes_message() {
    let cli = Cli::try_parse_from(["seoulpet-cli", "migrate", "create", "add index"]).unwrap();
    match cli.command {
        Some(Commands::Migrate { source, command }) => {
            assert_eq!(source, "migrations");
            assert_eq!(
                command,
                MigrateCommands::Create {
                    message: "add index".to_string()
                }
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn migrate_downgrade_accepts_minus_one() {
    let cli = Cli::try_parse_from(["seoulpet-cli", "migrate", "downgrade", "-1"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Migrate {
            command: MigrateCommands::Downgrade { ref revision },
            ..
        }) if revision == "-1"
    ));
}

#[test]
fn migrate_source_can_be_overridden() {
    let cli = Cli::try_parse_from([
        "seoulpet-cli",
        "migrate",
        "--source",
        "db/migrations",
        "upgrade",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Migrate {
            ref source,
            command: MigrateCommands::Upgrade
        }) if source == "db/migrations"
    ));
}

#[test]
fn migrate_downgrade_requires_revision() {
    let result = Cli::try_parse_from(["seoulpet-cli", "migrate", "downgrade"]);
    assert!(result.is_err());
}
