use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub price: i64,
    pub quantity: i32,
    pub quantity_alert: i32,
    pub brand: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub specifications: String,
    pub source: String,
    pub date_arrival: DateTimeWithTimeZone,
    pub is_rentable: bool,
    pub product_picture: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Categories,
    #[sea_orm(has_many = "super::order_on_products::Entity")]
    OrderOnProducts,
    #[sea_orm(has_many = "super::cart_on_items::Entity")]
    CartOnItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::order_on_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderOnProducts.def()
    }
}

impl Related<super::cart_on_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartOnItems.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_on_products::Relation::Orders.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_on_products::Relation::Products.def().rev())
    }
}

impl Related<super::carts::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_on_items::Relation::Carts.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::cart_on_items::Relation::Products.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
