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
        Products,
        categories::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryWhereUnique {
    Id(Uuid),
    Slug(String),
}

impl UniqueWhere for CategoryWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            CategoryWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            CategoryWhereUnique::Slug(slug) => {
                Condition::all().add(Column::Slug.eq(slug.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategory {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl CreateCategory {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            slug: slug.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl CreateInput<Entity> for CreateCategory {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let now = now();
        let model = ActiveModel {
            id: Set(id),
            name: Set(self.name),
            slug: Set(self.slug),
            created_at: Set(self.created_at.unwrap_or(now)),
            updated_at: Set(self.updated_at.unwrap_or(now)),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategory {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
}

impl UpdateInput<Entity> for UpdateCategory {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::Name, self.name)
            .set(Column::Slug, self.slug)
            .set(Column::CreatedAt, self.created_at)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Category;

    type Unique = CategoryWhereUnique;
    type Create = CreateCategory;
    type Update = UpdateCategory;

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
        &["product"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        match relation {
            "product" => Ok(Loaded::many(
                ModelName::Product,
                model.find_related(Products).all(conn).await?,
            )),
            other => Err(unknown_relation(Self::NAME, other)),
        }
    }
}
