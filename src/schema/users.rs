use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set,
    prelude::DateTimeWithTimeZone, sea_query::SimpleExpr,
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
        Carts, Products, Rents, Teams,
        users::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserWhereUnique {
    Id(Uuid),
    Email(String),
}

impl UniqueWhere for UserWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            UserWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
            UserWhereUnique::Email(email) => Condition::all().add(Column::Email.eq(email.as_str())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUser {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub team_id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
    #[serde(default)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl CreateUser {
    pub fn new(
        team_id: Uuid,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            team_id,
            name: name.into(),
            email: email.into(),
            password: password.into(),
            profile_picture: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl CreateInput<Entity> for CreateUser {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let now = now();
        let model = ActiveModel {
            id: Set(id),
            team_id: Set(self.team_id),
            name: Set(self.name),
            email: Set(self.email),
            password: Set(self.password),
            profile_picture: Set(self.profile_picture),
            created_at: Set(self.created_at.unwrap_or(now)),
            updated_at: Set(self.updated_at.unwrap_or(now)),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub profile_picture: Option<Option<String>>,
    #[serde(default)]
    pub created_at: Option<DateTimeWithTimeZone>,
}

impl UpdateInput<Entity> for UpdateUser {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::TeamId, self.team_id)
            .set(Column::Name, self.name)
            .set(Column::Email, self.email)
            .set(Column::Password, self.password)
            .set(Column::ProfilePicture, self.profile_picture)
            .set(Column::CreatedAt, self.created_at)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::User;

    type Unique = UserWhereUnique;
    type Create = CreateUser;
    type Update = UpdateUser;

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
        &["team", "rent", "product", "cart"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "team" => Loaded::one(ModelName::Team, model.find_related(Teams).one(conn).await?),
            "rent" => Loaded::many(ModelName::Rent, model.find_related(Rents).all(conn).await?),
            "product" => Loaded::many(
                ModelName::Product,
                model.find_related(Products).all(conn).await?,
            ),
            "cart" => Loaded::one(ModelName::Cart, model.find_related(Carts).one(conn).await?),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
