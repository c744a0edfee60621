// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `playkit token`

use std::sync::Arc;

use crate::credential::session::SessionManager;

pub async fn run(manager: &Arc<SessionManager>) -> i32 {
    if let Err(e) = manager.initialize().await {
        return super::report(&e);
    }
    let threshold = manager.config().refresh_threshold();
    if let Err(e) = manager.ensure_valid_token(threshold).await {
        return super::report(&e);
    }
    match manager.access_token().await {
        Ok(token) => {
            println!("{token}");
            0
        }
        Err(e) => super::report(&e),
    }
}
