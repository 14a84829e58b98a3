use super::*;

#[test]
fn parses_daily_defaults() {
    let cli = Cli::try_parse_from(["adrev-cli", "daily"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Daily {
            date: None,
            force: false
        })
    ));
}

#[test]
fn parses_daily_with_date_and_force() {
    let cli = Cli::try_parse_from(["adrev-cli", "daily", "--date", "2024-01-10", "--force"])
        .expect("expected valid cli args");

    let expected = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Daily {
            date: Some(d),
            force: true
        }) if d == expected
    ));
}

#[test]
fn rejects_invalid_date() {
    let result = Cli::try_parse_from(["adrev-cli", "daily", "--date", "not-a-date"]);
    assert!(result.is_err());
}

#[test]
fn parses_backfill_default_days() {
    let cli = Cli::try_parse_from(["adrev-cli", "backfill"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Backfill { days: 7 })
    ));
}

#[test]
fn parses_backfill_with_days() {
    let cli = Cli::try_parse_from(["adrev-cli", "backfill", "--days", "30"])
        .expect("expected valid cli args");

    assert!(matches!(cli.command, Some(Commands::Backfill { days: 30 })));
}

#[test]
fn parses_force_update() {
    let cli = Cli::try_parse_from(["adrev-cli", "force-update"]).expect("expected valid cli args");

    assert!(matches!(cli.command, Some(Commands::ForceUpdate)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["adrev-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
