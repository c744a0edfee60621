// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `playkit login`

use std::sync::Arc;

use crate::config::AuthMode;
use crate::credential::device_code::FlowOptions;
use crate::credential::session::SessionManager;
use crate::error::{AuthError, ErrorCode};

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Discard any stored session and sign in again.
    #[arg(long)]
    pub force: bool,
}

pub async fn run(manager: &Arc<SessionManager>, args: &LoginArgs) -> i32 {
    if args.force {
        // The device flow needs someone to open the authorization URL.
        if manager.config().mode == AuthMode::Headless {
            return super::report(&AuthError::new(
                ErrorCode::NotAuthenticated,
                "headless mode cannot run the device flow; use --mode interactive",
            ));
        }
        manager.logout().await;
        let options = FlowOptions { scope: manager.config().scope.clone(), interactive: true };
        if let Err(e) = manager.start_device_flow(options).await {
            return super::report(&e);
        }
    } else if let Err(e) = manager.initialize().await {
        return super::report(&e);
    }

    let session = manager.session().await;
    let kind = session.token_kind.map(|k| k.as_str()).unwrap_or("unknown");
    eprintln!("Authenticated ({kind} token) for game {}", manager.config().game_id);
    0
}
