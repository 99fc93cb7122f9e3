use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, prelude::DateTimeWithTimeZone,
    sea_query::SimpleExpr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, double_option, now,
    unknown_relation,
};
use crate::{
    engine::ModelName,
    entity::{
        CartOnItems, Categories, OrderOnProducts, Users,
        products::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
    query::NumberUpdate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductWhereUnique {
    Id(Uuid),
    Slug(String),
}

impl UniqueWhere for ProductWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            ProductWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            ProductWhereUnique::Slug(slug) => Condition::all().add(Column::Slug.eq(slug.as_str())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProduct {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub quantity: i32,
    pub quantity_alert: i32,
    pub brand: String,
    pub description: String,
    pub specifications: String,
    pub source: String,
    pub date_arrival: DateTimeWithTimeZone,
    #[serde(default = "rentable")]
    pub is_rentable: bool,
    #[serde(default)]
    pub product_picture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

fn rentable() -> bool {
    true
}

impl CreateInput<Entity> for CreateProduct {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let now = now();
        let model = ActiveModel {
            id: Set(id),
            user_id: Set(self.user_id),
            category_id: Set(self.category_id),
            name: Set(self.name),
            slug: Set(self.slug),
            price: Set(self.price),
            quantity: Set(self.quantity),
            quantity_alert: Set(self.quantity_alert),
            brand: Set(self.brand),
            description: Set(self.description),
            specifications: Set(self.specifications),
            source: Set(self.source),
            date_arrival: Set(self.date_arrival),
            is_rentable: Set(self.is_rentable),
            product_picture: Set(self.product_picture),
            created_at: Set(self.created_at.unwrap_or(now)),
            updated_at: Set(self.updated_at.unwrap_or(now)),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProduct {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub price: Option<NumberUpdate<i64>>,
    #[serde(default)]
    pub quantity: Option<NumberUpdate<i32>>,
    #[serde(default)]
    pub quantity_alert: Option<NumberUpdate<i32>>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub specifications: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date_arrival: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub is_rentable: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub product_picture: Option<Option<String>>,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
}

impl UpdateInput<Entity> for UpdateProduct {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::UserId, self.user_id)
            .set(Column::CategoryId, self.category_id)
            .set(Column::Name, self.name)
            .set(Column::Slug, self.slug)
            .number(Column::Price, self.price)
            .number(Column::Quantity, self.quantity)
            .number(Column::QuantityAlert, self.quantity_alert)
            .set(Column::Brand, self.brand)
            .set(Column::Description, self.description)
            .set(Column::Specifications, self.specifications)
            .set(Column::Source, self.source)
            .set(Column::DateArrival, self.date_arrival)
            .set(Column::IsRentable, self.is_rentable)
            .set(Column::ProductPicture, self.product_picture)
            .set(Column::CreatedAt, self.created_at)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Product;

    type Unique = ProductWhereUnique;
    type Create = CreateProduct;
    type Update = UpdateProduct;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn updated_at_column() -> Option<Column> {
        Some(Column::UpdatedAt)
    }

    fn relations() -> &'static [&'static str] {
        &["user", "category", "order", "cart"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "user" => Loaded::one(ModelName::User, model.find_related(Users).one(conn).await?),
            "category" => Loaded::one(
                ModelName::Category,
                model.find_related(Categories).one(conn).await?,
            ),
            "order" => Loaded::many(
                ModelName::OrderOnProduct,
                model.find_related(OrderOnProducts).all(conn).await?,
            ),
            "cart" => Loaded::many(
                ModelName::CartOnItem,
                model.find_related(CartOnItems).all(conn).await?,
            ),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
