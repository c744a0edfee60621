// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `playkit` binary.

use playkit_specs::{ExchangeServer, Playkit};

#[tokio::test]
async fn help_lists_subcommands() -> anyhow::Result<()> {
    let run = Playkit::new()?.run(&["--help"]).await?;

    assert_eq!(run.code, Some(0));
    for cmd in ["login", "status", "token", "whoami", "logout"] {
        assert!(run.stdout.contains(cmd), "missing {cmd} in help:\n{}", run.stdout);
    }
    Ok(())
}

#[tokio::test]
async fn missing_game_id_is_usage_error() -> anyhow::Result<()> {
    let run = Playkit::new()?.run(&["status"]).await?;

    assert_eq!(run.code, Some(2));
    Ok(())
}

#[tokio::test]
async fn blank_game_id_is_usage_error() -> anyhow::Result<()> {
    let run = Playkit::new()?.args(&["--game-id", " "]).run(&["status"]).await?;

    assert_eq!(run.code, Some(2));
    assert!(run.stderr.contains("game id"), "stderr: {}", run.stderr);
    Ok(())
}

#[tokio::test]
async fn headless_token_without_credentials_fails() -> anyhow::Result<()> {
    let run = Playkit::new()?
        .args(&["--game-id", "space-game", "--base-url", "http://127.0.0.1:9"])
        .run(&["token"])
        .await?;

    assert_eq!(run.code, Some(1));
    assert!(run.stderr.contains("not_authenticated"), "stderr: {}", run.stderr);
    assert!(run.stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn status_without_session() -> anyhow::Result<()> {
    let run = Playkit::new()?.args(&["--game-id", "space-game"]).run(&["status"]).await?;

    assert_eq!(run.code, Some(0));
    let report = run.json()?;
    assert_eq!(report["gameId"], "space-game");
    assert_eq!(report["authenticated"], false);
    assert_eq!(report["expired"], false);
    assert!(report.get("tokenKind").is_none());
    Ok(())
}

#[tokio::test]
async fn developer_token_is_printed_without_network() -> anyhow::Result<()> {
    let run = Playkit::new()?
        .args(&["--game-id", "space-game", "--base-url", "http://127.0.0.1:9"])
        .env("PLAYKIT_DEVELOPER_TOKEN", "dev-123")
        .run(&["token"])
        .await?;

    assert_eq!(run.code, Some(0), "stderr: {}", run.stderr);
    assert_eq!(run.stdout.trim(), "dev-123");
    Ok(())
}

#[tokio::test]
async fn jwt_exchange_persists_encrypted_session() -> anyhow::Result<()> {
    let server = ExchangeServer::start("player-xyz").await?;
    let playkit = Playkit::new()?
        .args(&["--game-id", "space-game", "--base-url"])
        .arg(&server.base_url());

    let run = playkit.run(&["--jwt", "host-jwt", "token"]).await?;
    assert_eq!(run.code, Some(0), "stderr: {}", run.stderr);
    assert_eq!(run.stdout.trim(), "player-xyz");

    // The exchanged token was persisted, encrypted, in the state directory.
    let raw = std::fs::read_to_string(playkit.state_dir().join("credentials.json"))?;
    assert!(!raw.contains("player-xyz"), "token stored in plaintext: {raw}");

    let status = playkit.run(&["status"]).await?;
    assert_eq!(status.code, Some(0));
    let report = status.json()?;
    assert_eq!(report["authenticated"], true);
    assert_eq!(report["tokenKind"], "player");
    assert_eq!(report["encrypted"], true);

    let logout = playkit.run(&["logout"]).await?;
    assert_eq!(logout.code, Some(0));
    let report = playkit.run(&["status"]).await?.json()?;
    assert_eq!(report["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn headless_forced_login_fails_fast_and_keeps_session() -> anyhow::Result<()> {
    let server = ExchangeServer::start("player-xyz").await?;
    let playkit = Playkit::new()?
        .args(&["--game-id", "space-game", "--base-url"])
        .arg(&server.base_url());
    let run = playkit.run(&["--jwt", "host-jwt", "token"]).await?;
    assert_eq!(run.code, Some(0), "stderr: {}", run.stderr);

    let started = std::time::Instant::now();
    let login = playkit.run(&["login", "--force"]).await?;

    assert_eq!(login.code, Some(1));
    assert!(login.stderr.contains("not_authenticated"), "stderr: {}", login.stderr);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    let report = playkit.run(&["status"]).await?.json()?;
    assert_eq!(report["authenticated"], true);
    Ok(())
}
