//! Rotation, reuse detection, and concurrency behavior

use crate::errors::{DomainError, TokenError};
use crate::services::token::TokenService;
use crate::services::token::clock::Clock;

use super::default_fixture;

#[tokio::test]
async fn test_refresh_rotates_and_old_token_is_single_use() {
    let f = default_fixture();
    let user_id = f.identity.add_account("ada@example.com", "pw").await;

    let pair = f
        .service
        .issue_pair(user_id, "ada@example.com", None, None)
        .await
        .unwrap();

    let grant = f.service.refresh(&pair.refresh_token, None, None).await.unwrap();
    assert_eq!(grant.user.id, user_id);
    assert_eq!(grant.user.email, "ada@example.com");
    assert_ne!(grant.tokens.refresh_token, pair.refresh_token);

    // Replaying the rotated-away token is flagged as reuse.
    let replay = f.service.refresh(&pair.refresh_token, None, None).await;
    assert!(matches!(
        replay,
        Err(DomainError::Token(TokenError::RefreshTokenReused))
    ));

    // The successor still works.
    f.service
        .refresh(&grant.tokens.refresh_token, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rotation_chain_integrity() {
    let f = default_fixture();
    let user_id = f.identity.add_account("ada@example.com", "pw").await;

    let mut current = f
        .service
        .issue_pair(user_id, "ada@example.com", None, None)
        .await
        .unwrap()
        .refresh_token;

    let n = 4;
    for _ in 0..n {
        current = f
            .service
            .refresh(&current, None, None)
            .await
            .unwrap()
            .tokens
            .refresh_token;
    }

    let now = f.clock.now();
    let rows = f.repository.all_rows().await;
    assert_eq!(rows.len(), n + 1);

    // Exactly one token in the chain is active, and it is the latest one.
    let head_hash = TokenService::<crate::repositories::MockTokenRepository>::hash_token(&current);
    let active: Vec<_> = rows.iter().filter(|t| t.is_active(now)).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].token_hash, head_hash);
    assert_eq!(active[0].replaced_by, None);

    // Walk the chain backwards: every revoked row names its successor, and
    // following the links from the head reaches all n predecessors.
    let mut links = 0;
    let mut cursor_id = active[0].id;
    while let Some(prev) = rows.iter().find(|t| t.replaced_by == Some(cursor_id)) {
        assert!(prev.is_revoked());
        links += 1;
        cursor_id = prev.id;
    }
    assert_eq!(links, n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_refresh_has_exactly_one_winner() {
    let f = default_fixture();
    let user_id = f.identity.add_account("ada@example.com", "pw").await;

    let pair = f
        .service
        .issue_pair(user_id, "ada@example.com", None, None)
        .await
        .unwrap();

    let s1 = f.service.clone();
    let s2 = f.service.clone();
    let t1 = pair.refresh_token.clone();
    let t2 = pair.refresh_token.clone();

    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.refresh(&t1, None, None).await }),
        tokio::spawn(async move { s2.refresh(&t2, None, None).await }),
    );
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    let successes = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent refresh must win");

    let loser = if r1.is_ok() { r2 } else { r1 };
    assert!(matches!(
        loser,
        Err(DomainError::Token(
            TokenError::RefreshTokenReused | TokenError::InvalidRefreshToken
        ))
    ));

    // Only the winner's successor is active afterwards.
    let active = f.service.list_active_sessions(user_id).await.unwrap();
    assert_eq!(active.len(), 1);
}
