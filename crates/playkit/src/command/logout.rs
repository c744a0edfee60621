// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `playkit logout`

use crate::credential::session::SessionManager;

pub async fn run(manager: &SessionManager) -> i32 {
    manager.logout().await;
    eprintln!("Logged out of game {}", manager.config().game_id);
    0
}
