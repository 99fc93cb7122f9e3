use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, unknown_relation};
use crate::{
    engine::ModelName,
    entity::{
        Carts, Products,
        cart_on_items::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
    query::NumberUpdate,
};

/// `{"id": ...}` or the compound key `{"cart_id_product_id": {"cart_id": ..., "product_id": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOnItemWhereUnique {
    Id(Uuid),
    CartIdProductId { cart_id: Uuid, product_id: Uuid },
}

impl UniqueWhere for CartOnItemWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            CartOnItemWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            CartOnItemWhereUnique::CartIdProductId {
                cart_id,
                product_id,
            } => Condition::all()
                .add(Column::CartId.eq(*cart_id))
                .add(Column::ProductId.eq(*product_id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCartOnItem {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

impl CreateCartOnItem {
    pub fn new(cart_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
        Self {
            id: None,
            cart_id,
            product_id,
            quantity,
        }
    }
}

impl CreateInput<Entity> for CreateCartOnItem {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            cart_id: Set(self.cart_id),
            product_id: Set(self.product_id),
            quantity: Set(self.quantity),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCartOnItem {
    #[serde(default)]
    pub cart_id: Option<Uuid>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: Option<NumberUpdate<i32>>,
}

impl UpdateInput<Entity> for UpdateCartOnItem {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::CartId, self.cart_id)
            .set(Column::ProductId, self.product_id)
            .number(Column::Quantity, self.quantity)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::CartOnItem;

    type Unique = CartOnItemWhereUnique;
    type Create = CreateCartOnItem;
    type Update = UpdateCartOnItem;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["cart", "product"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "cart" => Loaded::one(ModelName::Cart, model.find_related(Carts).one(conn).await?),
            "product" => Loaded::one(
                ModelName::Product,
                model.find_related(Products).one(conn).await?,
            ),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
