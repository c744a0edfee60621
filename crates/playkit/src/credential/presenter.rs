// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login UI hooks for the interactive device flow.
//!
//! Presentation is decorative: the flow resolves the same way whether or not
//! anything is shown.

use std::time::Duration;

use crate::error::ErrorCategory;

/// Shows flow progress to a human.
pub trait FlowPresenter: Send + Sync {
    fn show_pending(&self, authorization_url: &str, expires_in: Duration);
    fn show_success(&self);
    fn show_failure(&self, category: ErrorCategory, message: &str);
}

/// Opens the authorization URL for the user.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> anyhow::Result<()>;
}

/// Prints flow progress to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPresenter;

impl FlowPresenter for TerminalPresenter {
    fn show_pending(&self, authorization_url: &str, expires_in: Duration) {
        eprintln!("To sign in, open this URL in a browser:");
        eprintln!();
        eprintln!("    {authorization_url}");
        eprintln!();
        let minutes = expires_in.as_secs().div_ceil(60);
        eprintln!("Waiting for authorization (expires in {minutes} min)...");
    }

    fn show_success(&self) {
        eprintln!("Signed in.");
    }

    fn show_failure(&self, category: ErrorCategory, message: &str) {
        match category {
            ErrorCategory::Denied => eprintln!("Sign-in was declined."),
            ErrorCategory::Expired => eprintln!("Sign-in link expired. Run the command again."),
            ErrorCategory::Failure => eprintln!("Sign-in failed: {message}"),
        }
    }
}

/// Presenter for hosts without UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPresenter;

impl FlowPresenter for SilentPresenter {
    fn show_pending(&self, _: &str, _: Duration) {}
    fn show_success(&self) {}
    fn show_failure(&self, _: ErrorCategory, _: &str) {}
}

/// Launches the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    /// The launcher command for this platform: `open` on macOS, `xdg-open`
    /// elsewhere on Unix, and the `start` builtin through `cmd` on Windows.
    fn command(url: &str) -> std::process::Command {
        if cfg!(target_os = "windows") {
            let mut cmd = std::process::Command::new("cmd");
            // Empty title; `start` treats the first quoted argument as one.
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
            let mut cmd = std::process::Command::new(program);
            cmd.arg(url);
            cmd
        }
    }
}

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        let mut child = Self::command(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Opener that does nothing; the presenter shows the URL instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOpener;

impl UrlOpener for NoopOpener {
    fn open(&self, _: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
