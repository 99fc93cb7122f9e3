use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, Set, prelude::DateTimeWithTimeZone,
    sea_query::SimpleExpr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, now, unknown_relation,
};
use crate::{
    engine::ModelName,
    entity::token_blacklist::{ActiveModel, Column, Entity, Model},
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBlacklistWhereUnique {
    Id(Uuid),
    TokenHash(String),
}

impl UniqueWhere for TokenBlacklistWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            TokenBlacklistWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            TokenBlacklistWhereUnique::TokenHash(hash) => {
                Condition::all().add(Column::TokenHash.eq(hash.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenBlacklist {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub token: String,
    pub token_hash: String,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
    pub expires_at: DateTimeWithTimeZone,
}

impl CreateInput<Entity> for CreateTokenBlacklist {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            token: Set(self.token),
            token_hash: Set(self.token_hash),
            created_at: Set(self.created_at.unwrap_or_else(now)),
            expires_at: Set(self.expires_at),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTokenBlacklist {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_hash: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTimeWithTimeZone>,
}

impl UpdateInput<Entity> for UpdateTokenBlacklist {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::Token, self.token)
            .set(Column::TokenHash, self.token_hash)
            .set(Column::ExpiresAt, self.expires_at)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::TokenBlacklist;

    type Unique = TokenBlacklistWhereUnique;
    type Create = CreateTokenBlacklist;
    type Update = UpdateTokenBlacklist;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    async fn load_relation<C>(_conn: &C, _model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Err(unknown_relation(Self::NAME, relation))
    }
}
