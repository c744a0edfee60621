// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Runs the real `playkit` binary as a subprocess with an isolated state
//! directory and no `PLAYKIT_*` variables inherited from the caller.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Resolve the path to the compiled `playkit` binary.
pub fn playkit_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("playkit")
}

/// Captured result of one `playkit` invocation.
pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    fn from_output(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn json(&self) -> anyhow::Result<Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }
}

/// Builder for a single `playkit` invocation.
pub struct Playkit {
    args: Vec<String>,
    env: Vec<(String, String)>,
    state_dir: tempfile::TempDir,
}

impl Playkit {
    /// A headless invocation with its own state directory.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            args: vec!["--mode".into(), "headless".into(), "--log-level".into(), "warn".into()],
            env: Vec::new(),
            state_dir: tempfile::tempdir()?,
        })
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_owned());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Run `cmd` (subcommand plus its flags) and wait for it to exit.
    pub async fn run(&self, cmd: &[&str]) -> anyhow::Result<Run> {
        let binary = playkit_binary();
        anyhow::ensure!(binary.exists(), "playkit binary not found at {}", binary.display());

        let mut command = tokio::process::Command::new(&binary);
        for (key, _) in std::env::vars() {
            if key.starts_with("PLAYKIT_") {
                command.env_remove(key);
            }
        }
        command
            .args(&self.args)
            .arg("--state-dir")
            .arg(self.state_dir.path())
            .args(cmd)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(30), command.output()).await??;
        Ok(Run::from_output(output))
    }
}

/// A minimal platform that answers the JWT exchange endpoint.
pub struct ExchangeServer {
    pub addr: SocketAddr,
}

impl ExchangeServer {
    pub async fn start(player_token: &str) -> anyhow::Result<Self> {
        let token = player_token.to_owned();
        let app = Router::new().route(
            "/api/external/exchange-jwt",
            post(move |Json(_): Json<Value>| {
                let token = token.clone();
                async move { Json(json!({ "playerToken": token, "expiresInSeconds": 3600 })) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}
