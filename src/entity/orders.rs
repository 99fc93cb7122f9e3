use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{OrderStatus, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub rent_id: Uuid,
    pub invoice: String,
    pub order_date: DateTimeWithTimeZone,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub total_cost: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rents::Entity",
        from = "Column::RentId",
        to = "super::rents::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Rents,
    #[sea_orm(has_many = "super::order_on_products::Entity")]
    OrderOnProducts,
}

impl Related<super::rents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rents.def()
    }
}

impl Related<super::order_on_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderOnProducts.def()
    }
}

// Order <-> Product through the order lines.
impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_on_products::Relation::Products.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_on_products::Relation::Orders.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
