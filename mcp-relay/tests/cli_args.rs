//! CLI surface: the three modes are each exclusive and one is required.

use clap::Parser;

use mcp_relay::cli::Cli;

#[test]
fn test_a_mode_is_required() {
    assert!(Cli::try_parse_from(["mcp-relay"]).is_err());
}

#[test]
fn test_dynamic_mode_with_config() {
    let cli = Cli::try_parse_from(["mcp-relay", "--dynamic", "--config", "relay.yaml"]).unwrap();
    assert!(cli.dynamic);
    assert!(!cli.proxy);
    assert_eq!(cli.config.unwrap().to_str(), Some("relay.yaml"));
}

#[test]
fn test_proxy_mode_requires_config() {
    assert!(Cli::try_parse_from(["mcp-relay", "--proxy"]).is_err());
}

#[test]
fn test_proxy_mode_with_log_and_record() {
    let cli = Cli::try_parse_from([
        "mcp-relay",
        "--proxy",
        "--config",
        "relay.yaml",
        "--log",
        "/tmp/relay.log",
        "--record",
        "session.jsonl",
    ])
    .unwrap();
    assert!(cli.proxy);
    assert_eq!(cli.record.unwrap().to_str(), Some("session.jsonl"));
    assert_eq!(cli.log.unwrap().to_str(), Some("/tmp/relay.log"));
}

#[test]
fn test_playback_client_mode() {
    let cli = Cli::try_parse_from(["mcp-relay", "--playback-client", "session.jsonl"]).unwrap();
    assert!(cli.playback_client.is_some());
    assert!(cli.config.is_none());
}

#[test]
fn test_modes_are_mutually_exclusive() {
    assert!(Cli::try_parse_from(["mcp-relay", "--proxy", "--dynamic", "--config", "c.yaml"]).is_err());
    assert!(Cli::try_parse_from([
        "mcp-relay",
        "--playback-client",
        "a.jsonl",
        "--playback-server",
        "b.jsonl"
    ])
    .is_err());
    assert!(Cli::try_parse_from([
        "mcp-relay",
        "--proxy",
        "--config",
        "c.yaml",
        "--playback-client",
        "a.jsonl"
    ])
    .is_err());
}
