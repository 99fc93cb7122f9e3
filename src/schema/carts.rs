use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, unknown_relation};
use crate::{
    engine::ModelName,
    entity::{
        CartOnItems, Users,
        carts::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartWhereUnique {
    Id(Uuid),
    UserId(Uuid),
}

impl UniqueWhere for CartWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            CartWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            CartWhereUnique::UserId(id) => Condition::all().add(Column::UserId.eq(*id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCart {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
}

impl CreateCart {
    pub fn for_user(user_id: Uuid) -> Self {
        Self { id: None, user_id }
    }
}

impl CreateInput<Entity> for CreateCart {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            user_id: Set(self.user_id),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCart {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl UpdateInput<Entity> for UpdateCart {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new().set(Column::UserId, self.user_id).finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Cart;

    type Unique = CartWhereUnique;
    type Create = CreateCart;
    type Update = UpdateCart;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["user", "item"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "user" => Loaded::one(ModelName::User, model.find_related(Users).one(conn).await?),
            "item" => Loaded::many(
                ModelName::CartOnItem,
                model.find_related(CartOnItems).all(conn).await?,
            ),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
