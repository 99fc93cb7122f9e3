mod common;

use chrono::{Duration, Utc};
use rental_client::{
    blacklist::{hash_token, is_revoked, purge_expired, revoke_token},
    query::Where,
};

#[tokio::test]
async fn revoked_tokens_are_found_by_hash() {
    let client = common::client().await;
    let expires = Utc::now() + Duration::hours(1);

    assert!(!is_revoked(&client, "token-a").await.unwrap());
    revoke_token(&client, "token-a", expires).await.unwrap();
    revoke_token(&client, "token-a", expires + Duration::hours(1)).await.unwrap();

    assert!(is_revoked(&client, "token-a").await.unwrap());
    assert!(!is_revoked(&client, "token-b").await.unwrap());
    assert_eq!(client.token_blacklist().count(Where::all()).await.unwrap(), 1);

    let stored = client
        .token_blacklist()
        .find_first(Default::default())
        .await
        .unwrap()
        .expect("row");
    assert_eq!(stored.token_hash, hash_token("token-a"));
    assert_eq!(
        stored.expires_at.timestamp(),
        (expires + Duration::hours(1)).timestamp()
    );
}

#[tokio::test]
async fn revoking_again_with_an_earlier_expiry_keeps_the_later_one() {
    let client = common::client().await;
    let later = Utc::now() + Duration::hours(3);
    revoke_token(&client, "token-a", later).await.unwrap();
    revoke_token(&client, "token-a", later - Duration::hours(2)).await.unwrap();

    let stored = client
        .token_blacklist()
        .find_first(Default::default())
        .await
        .unwrap()
        .expect("row");
    assert_eq!(stored.expires_at.timestamp(), later.timestamp());
    assert_eq!(client.token_blacklist().count(Where::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn purge_drops_only_expired_entries() {
    let client = common::client().await;
    let now = Utc::now();
    revoke_token(&client, "old", now - Duration::hours(2)).await.unwrap();
    revoke_token(&client, "fresh", now + Duration::hours(2)).await.unwrap();

    let removed = purge_expired(&client, now).await.unwrap();
    assert_eq!(removed, 1);
    assert!(is_revoked(&client, "fresh").await.unwrap());
    assert!(!is_revoked(&client, "old").await.unwrap());
}
