// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands: `login`, `status`, `token`, `whoami`, `logout`.
//!
//! Each returns a process exit code: 0 on success, 1 on an authentication
//! failure, 2 on a usage error.

pub mod login;
pub mod logout;
pub mod status;
pub mod token;
pub mod whoami;

use std::sync::Arc;

use crate::config::SdkConfig;
use crate::credential::session::SessionManager;
use crate::error::AuthError;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Sign in, running the device authorization flow if needed.
    Login(login::LoginArgs),
    /// Show the stored session for this game (no network).
    Status,
    /// Print a valid bearer token, refreshing it first if needed.
    Token,
    /// Show the signed-in player.
    Whoami,
    /// Forget the stored session for this game.
    Logout,
}

pub async fn run(command: &Command, config: SdkConfig) -> i32 {
    let manager = match SessionManager::builder(config).build() {
        Ok(m) => m,
        Err(e) => return report(&e),
    };
    match command {
        Command::Login(args) => login::run(&manager, args).await,
        Command::Status => status::run(&manager),
        Command::Token => token::run(&manager).await,
        Command::Whoami => whoami::run(Arc::clone(&manager)).await,
        Command::Logout => logout::run(&manager).await,
    }
}

/// Print an error and map it to an exit code.
pub(crate) fn report(err: &AuthError) -> i32 {
    eprintln!("error: {err}");
    exit_code(err)
}

pub fn exit_code(err: &AuthError) -> i32 {
    if err.code.is_usage() {
        2
    } else {
        1
    }
}
