//! Unit tests for CLI commands

use std::io::Write as _;

use clap::Parser;

use crate::cli::{run, Cli, Commands};

const TABLE: &str = "\
middleware: [recovery, request_id]
routes:
  - method: GET
    path: /users/:id
    handler: get_user
  - method: GET
    path: /files/*path
    handler: get_file
  - method: POST
    path: /users
    handler: create_user
";

fn table_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(TABLE.as_bytes()).unwrap();
    file
}

fn run_args(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::<u8>::new();
    run(&cli, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_resolve_command_parses() {
    let cli = Cli::try_parse_from([
        "brrtrouter-dispatch",
        "resolve",
        "--table",
        "routes.yaml",
        "GET",
        "/users/1",
    ])
    .unwrap();
    match cli.command {
        Commands::Resolve {
            table,
            method,
            path,
        } => {
            assert_eq!(table.to_string_lossy(), "routes.yaml");
            assert_eq!(method, "GET");
            assert_eq!(path, "/users/1");
        }
        other => panic!("Expected Resolve command, got {other:?}"),
    }
}

#[test]
fn test_check_lists_routes() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let out = run_args(&["brrtrouter-dispatch", "check", "--table", &path]);
    assert!(out.starts_with("3 routes OK"), "{out}");
    assert!(out.contains("/files/*path"));
    assert!(out.contains("served by echo: get_user, get_file, create_user"));
}

#[test]
fn test_resolve_prints_params() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let out = run_args(&[
        "brrtrouter-dispatch",
        "resolve",
        "--table",
        &path,
        "GET",
        "/files/a/b.txt",
    ]);
    assert!(out.contains("MATCH GET /files/*path"), "{out}");
    assert!(out.contains("path = a/b.txt"));
}

#[test]
fn test_resolve_negative_results() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let out = run_args(&["brrtrouter-dispatch", "resolve", "--table", &path, "DELETE", "/users"]);
    assert_eq!(out.trim(), "METHOD NOT ALLOWED (allow: POST)");
    let out = run_args(&["brrtrouter-dispatch", "resolve", "--table", &path, "GET", "/nope"]);
    assert_eq!(out.trim(), "NOT FOUND");
}

#[test]
fn test_dispatch_echoes_request_id() {
    let file = table_file();
    let path = file.path().to_string_lossy().to_string();
    let out = run_args(&[
        "brrtrouter-dispatch",
        "dispatch",
        "--table",
        &path,
        "GET",
        "/users/7?full=1",
        "-H",
        "x-request-id: 01ARZ3NDEKTSV4RRFFQ69G5FAV",
    ]);
    assert!(out.starts_with("HTTP 200"), "{out}");
    assert!(out.contains("x-request-id: 01ARZ3NDEKTSV4RRFFQ69G5FAV"));
    assert!(out.contains("\"id\": \"7\""));
    assert!(out.contains("\"full\": \"1\""));
}

#[test]
fn test_check_reports_bad_pattern() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"routes":[{{"method":"GET","path":"/a/{{id","handler":"x"}}]}}"#
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["brrtrouter-dispatch", "check", "--table", &path]).unwrap();
    let err = run(&cli, &mut Vec::<u8>::new()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("malformed segment '{id'"), "{msg}");
}
