use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, unknown_relation};
use crate::{
    engine::ModelName,
    entity::{
        Users,
        teams::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamWhereUnique {
    Id(Uuid),
    Slug(String),
}

impl UniqueWhere for TeamWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            TeamWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            TeamWhereUnique::Slug(slug) => Condition::all().add(Column::Slug.eq(slug.as_str())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTeam {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub slug: String,
}

impl CreateTeam {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            slug: slug.into(),
        }
    }
}

impl CreateInput<Entity> for CreateTeam {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            name: Set(self.name),
            slug: Set(self.slug),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTeam {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl UpdateInput<Entity> for UpdateTeam {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::Name, self.name)
            .set(Column::Slug, self.slug)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Team;

    type Unique = TeamWhereUnique;
    type Create = CreateTeam;
    type Update = UpdateTeam;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["user"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        match relation {
            "user" => Ok(Loaded::many(
                ModelName::User,
                model.find_related(Users).all(conn).await?,
            )),
            other => Err(unknown_relation(Self::NAME, other)),
        }
    }
}
