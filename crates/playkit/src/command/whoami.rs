// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `playkit whoami`

use std::sync::Arc;

use crate::credential::session::SessionManager;
use crate::player::PlayerClient;

pub async fn run(manager: Arc<SessionManager>) -> i32 {
    if let Err(e) = manager.initialize().await {
        return super::report(&e);
    }
    let player = PlayerClient::new(manager);
    match player.player_info().await {
        Ok(info) => {
            let nickname = info.nickname.as_deref().unwrap_or("-");
            println!("{:<12} {}", "USER", info.user_id);
            println!("{:<12} {nickname}", "NICKNAME");
            println!("{:<12} {}", "BALANCE", info.balance);
            0
        }
        Err(e) => super::report(&e),
    }
}
