//! Revoked bearer tokens, stored by SHA-256 digest.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::{
    client::Client,
    entity::token_blacklist::Column,
    error::ClientResult,
    query::{Filter, Where},
    schema::{CreateTokenBlacklist, TokenBlacklistWhereUnique, UpdateTokenBlacklist},
};

/// Hex-encoded SHA-256 of a raw token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Blacklist `token` until `expires_at`. Revoking twice keeps one row and the later expiry.
pub async fn revoke_token(
    client: &Client,
    token: &str,
    expires_at: DateTime<Utc>,
) -> ClientResult<()> {
    let token = token.to_string();
    let token_hash = hash_token(&token);
    let expires_at = expires_at.fixed_offset();
    client
        .transaction(None, move |tx| {
            Box::pin(async move {
                let blacklist = tx.token_blacklist();
                let key = TokenBlacklistWhereUnique::TokenHash(token_hash.clone());
                match blacklist.find_unique(key).await? {
                    Some(existing) if existing.expires_at >= expires_at => {}
                    Some(existing) => {
                        let update = UpdateTokenBlacklist {
                            expires_at: Some(expires_at),
                            ..Default::default()
                        };
                        blacklist
                            .update(TokenBlacklistWhereUnique::Id(existing.id), update)
                            .await?;
                    }
                    None => {
                        blacklist
                            .create(CreateTokenBlacklist {
                                id: None,
                                token,
                                token_hash,
                                created_at: None,
                                expires_at,
                            })
                            .await?;
                    }
                }
                Ok(())
            })
        })
        .await?;
    tracing::debug!("token revoked");
    Ok(())
}

pub async fn is_revoked(client: &Client, token: &str) -> ClientResult<bool> {
    let found = client
        .token_blacklist()
        .find_unique(TokenBlacklistWhereUnique::TokenHash(hash_token(token)))
        .await?;
    Ok(found.is_some())
}

/// Drop entries whose token has expired anyway.
pub async fn purge_expired(client: &Client, now: DateTime<Utc>) -> ClientResult<u64> {
    let filter = Where::field(Column::ExpiresAt, Filter::Lt(now.fixed_offset().into()));
    let removed = client.token_blacklist().delete_many(filter).await?.count;
    if removed > 0 {
        tracing::info!(removed, "purged expired blacklist entries");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_token("abd"), hash);
    }
}
