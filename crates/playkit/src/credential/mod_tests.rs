// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn grant() -> TokenResult {
    TokenResult {
        access_token: "access".to_owned(),
        token_type: Some("Bearer".to_owned()),
        expires_in_secs: 3600,
        refresh_token: Some("refresh".to_owned()),
        refresh_expires_in_secs: Some(2_592_000),
        scope: None,
    }
}

#[test]
fn from_grant_sets_absolute_expiries() {
    let session = Session::from_grant(&grant(), 1_000);
    assert!(session.is_valid());
    assert_eq!(session.token_kind, Some(TokenKind::Player));
    assert_eq!(session.access_token_expires_at, Some(1_000 + 3_600_000));
    assert_eq!(session.refresh_token_expires_at, Some(1_000 + 2_592_000_000));
}

#[test]
fn huge_grant_lifetimes_saturate() {
    let mut huge = grant();
    huge.expires_in_secs = u64::MAX / 10;
    huge.refresh_expires_in_secs = Some(u64::MAX);
    let session = Session::from_grant(&huge, 1_000);
    assert_eq!(session.access_token_expires_at, Some(u64::MAX));
    assert_eq!(session.refresh_token_expires_at, Some(u64::MAX));
    assert!(!session.is_access_expired(epoch_ms()));
    assert!(session.can_refresh(epoch_ms()));
}

#[test]
fn expiry_after_is_exact_below_saturation() {
    assert_eq!(expiry_after(1_000, 60), 61_000);
    assert_eq!(expiry_after(u64::MAX - 10, 1), u64::MAX);
}

#[test]
fn untracked_token_never_expires() {
    let session = Session::untracked("dev", TokenKind::Developer);
    assert!(session.is_valid());
    assert!(!session.is_access_expired(u64::MAX));
    assert!(!session.can_refresh(0));
}

#[test]
fn authenticated_without_token_is_not_valid() {
    let session = Session { is_authenticated: true, ..Session::default() };
    assert!(!session.is_valid());
}

#[test]
fn refresh_requires_unexpired_refresh_token() {
    let mut session = Session::from_grant(&grant(), 0);
    assert!(session.can_refresh(10));
    session.refresh_token_expires_at = Some(5);
    assert!(!session.can_refresh(10));
    session.refresh_token_expires_at = None;
    assert!(session.can_refresh(10));
    session.refresh_token = None;
    assert!(!session.can_refresh(10));
}

#[test]
fn session_serializes_camel_case() -> anyhow::Result<()> {
    let session = Session::from_grant(&grant(), 0);
    let json = serde_json::to_value(&session)?;
    assert_eq!(json["isAuthenticated"], true);
    assert_eq!(json["tokenKind"], "player");
    assert_eq!(json["accessTokenExpiresAt"], 3_600_000);
    Ok(())
}
