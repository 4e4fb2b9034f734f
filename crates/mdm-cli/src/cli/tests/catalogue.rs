//! Tests for add-movie, add-release, pending, recent.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_add_movie() {
    match parse(&["mdm", "add-movie", "Dune (2021)"]) {
        CliCommand::AddMovie { title } => assert_eq!(title, "Dune (2021)"),
        _ => panic!("expected AddMovie"),
    }
}

#[test]
fn cli_parse_add_release() {
    match parse(&[
        "mdm",
        "add-release",
        "7",
        "1080p",
        "--thread",
        "t-123",
        "--links-file",
        "links.txt",
    ]) {
        CliCommand::AddRelease {
            movie_id,
            format,
            thread,
            links_file,
            title,
        } => {
            assert_eq!(movie_id, 7);
            assert_eq!(format, "1080p");
            assert_eq!(thread, "t-123");
            assert_eq!(links_file, PathBuf::from("links.txt"));
            assert!(title.is_none());
        }
        _ => panic!("expected AddRelease"),
    }
}

#[test]
fn cli_parse_add_release_with_title() {
    match parse(&[
        "mdm",
        "add-release",
        "1",
        "2160p",
        "--thread",
        "t",
        "--links-file",
        "/tmp/l",
        "--title",
        "Dune.2021.2160p.HDR",
    ]) {
        CliCommand::AddRelease { title, .. } => assert_eq!(title.as_deref(), Some("Dune.2021.2160p.HDR")),
        _ => panic!("expected AddRelease"),
    }
}

#[test]
fn cli_add_release_requires_thread() {
    assert!(Cli::try_parse_from(["mdm", "add-release", "1", "x265", "--links-file", "l"]).is_err());
}

#[test]
fn cli_parse_pending() {
    assert!(matches!(parse(&["mdm", "pending"]), CliCommand::Pending));
}

#[test]
fn cli_parse_recent_default_limit() {
    match parse(&["mdm", "recent"]) {
        CliCommand::Recent { limit } => assert_eq!(limit, 12),
        _ => panic!("expected Recent"),
    }
}

#[test]
fn cli_parse_recent_limit() {
    match parse(&["mdm", "recent", "--limit", "3"]) {
        CliCommand::Recent { limit } => assert_eq!(limit, 3),
        _ => panic!("expected Recent"),
    }
}
