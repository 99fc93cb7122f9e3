use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, unknown_relation};
use crate::{
    engine::ModelName,
    entity::{
        Orders, Products,
        order_on_products::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
    query::NumberUpdate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOnProductWhereUnique {
    Id(Uuid),
}

impl UniqueWhere for OrderOnProductWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            OrderOnProductWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderOnProduct {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
}

impl CreateInput<Entity> for CreateOrderOnProduct {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            order_id: Set(self.order_id),
            product_id: Set(self.product_id),
            quantity: Set(self.quantity),
            price: Set(self.price),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderOnProduct {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: Option<NumberUpdate<i32>>,
    #[serde(default)]
    pub price: Option<NumberUpdate<i64>>,
}

impl UpdateInput<Entity> for UpdateOrderOnProduct {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::OrderId, self.order_id)
            .set(Column::ProductId, self.product_id)
            .number(Column::Quantity, self.quantity)
            .number(Column::Price, self.price)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::OrderOnProduct;

    type Unique = OrderOnProductWhereUnique;
    type Create = CreateOrderOnProduct;
    type Update = UpdateOrderOnProduct;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["order", "product"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "order" => Loaded::one(ModelName::Order, model.find_related(Orders).one(conn).await?),
            "product" => Loaded::one(
                ModelName::Product,
                model.find_related(Products).one(conn).await?,
            ),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
