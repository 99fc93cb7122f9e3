use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, prelude::DateTimeWithTimeZone,
    sea_query::SimpleExpr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, now, unknown_relation,
};
use crate::{
    engine::ModelName,
    entity::{
        OrderOnProducts, OrderStatus, PaymentStatus, Rents,
        orders::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
    query::NumberUpdate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderWhereUnique {
    Id(Uuid),
    RentId(Uuid),
}

impl UniqueWhere for OrderWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            OrderWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            OrderWhereUnique::RentId(id) => Condition::all().add(Column::RentId.eq(*id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrder {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub rent_id: Uuid,
    pub invoice: String,
    #[serde(default)]
    pub order_date: Option<DateTimeWithTimeZone>,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub total_cost: i64,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
}

impl CreateInput<Entity> for CreateOrder {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            rent_id: Set(self.rent_id),
            invoice: Set(self.invoice),
            order_date: Set(self.order_date.unwrap_or_else(now)),
            start_date: Set(self.start_date),
            end_date: Set(self.end_date),
            total_cost: Set(self.total_cost),
            order_status: Set(self.order_status),
            payment_status: Set(self.payment_status),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrder {
    #[serde(default)]
    pub rent_id: Option<Uuid>,
    #[serde(default)]
    pub invoice: Option<String>,
    #[serde(default)]
    pub order_date: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub start_date: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub end_date: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub total_cost: Option<NumberUpdate<i64>>,
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateInput<Entity> for UpdateOrder {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::RentId, self.rent_id)
            .set(Column::Invoice, self.invoice)
            .set(Column::OrderDate, self.order_date)
            .set(Column::StartDate, self.start_date)
            .set(Column::EndDate, self.end_date)
            .number(Column::TotalCost, self.total_cost)
            .set(Column::OrderStatus, self.order_status)
            .set(Column::PaymentStatus, self.payment_status)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Order;

    type Unique = OrderWhereUnique;
    type Create = CreateOrder;
    type Update = UpdateOrder;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["rent", "product"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "rent" => Loaded::one(ModelName::Rent, model.find_related(Rents).one(conn).await?),
            "product" => Loaded::many(
                ModelName::OrderOnProduct,
                model.find_related(OrderOnProducts).all(conn).await?,
            ),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
