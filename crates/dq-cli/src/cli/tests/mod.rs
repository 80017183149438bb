//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_list() {
    assert!(matches!(parse(&["dq", "list"]), CliCommand::List));
}

#[test]
fn cli_parse_add() {
    match parse(&["dq", "add", "https://example.com/a.iso", "https://example.com/b.iso"]) {
        CliCommand::Add { urls } => {
            assert_eq!(
                urls,
                vec!["https://example.com/a.iso", "https://example.com/b.iso"]
            );
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_add_requires_at_least_one_url() {
    assert!(Cli::try_parse_from(["dq", "add"]).is_err());
}

#[test]
fn cli_parse_run() {
    assert!(matches!(parse(&["dq", "run"]), CliCommand::Run));
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["dq", "frobnicate"]).is_err());
}
