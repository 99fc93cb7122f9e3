use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
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
    #[sea_orm(has_many = "super::cart_on_items::Entity")]
    CartOnItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::cart_on_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartOnItems.def()
    }
}

// Cart <-> Product through the cart lines.
impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_on_items::Relation::Products.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::cart_on_items::Relation::Carts.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
