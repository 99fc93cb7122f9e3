use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, ModelTrait, Set, sea_query::SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Assignments, CreateInput, Loaded, Record, UniqueWhere, UpdateInput, double_option,
    unknown_relation,
};
use crate::{
    engine::ModelName,
    entity::{
        Orders, Users,
        rents::{ActiveModel, Column, Entity, Model},
    },
    error::ClientResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentWhereUnique {
    Id(Uuid),
}

impl UniqueWhere for RentWhereUnique {
    fn condition(&self) -> Condition {
        match self {
            RentWhereUnique::Id(id) => Condition::all().add(Column::Id.eq(*id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRent {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub identification: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub identification_picture: String,
    #[serde(default)]
    pub documentation_before: Option<String>,
    #[serde(default)]
    pub documentation_after: Option<String>,
}

impl CreateInput<Entity> for CreateRent {
    fn into_active_model(self) -> (Uuid, ActiveModel) {
        let id = self.id.unwrap_or_else(Uuid::new_v4);
        let model = ActiveModel {
            id: Set(id),
            user_id: Set(self.user_id),
            identification: Set(self.identification),
            phone: Set(self.phone),
            notes: Set(self.notes),
            identification_picture: Set(self.identification_picture),
            documentation_before: Set(self.documentation_before),
            documentation_after: Set(self.documentation_after),
        };
        (id, model)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRent {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub identification: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub identification_picture: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub documentation_before: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub documentation_after: Option<Option<String>>,
}

impl UpdateInput<Entity> for UpdateRent {
    fn into_exprs(self) -> Vec<(Column, SimpleExpr)> {
        Assignments::new()
            .set(Column::UserId, self.user_id)
            .set(Column::Identification, self.identification)
            .set(Column::Phone, self.phone)
            .set(Column::Notes, self.notes)
            .set(Column::IdentificationPicture, self.identification_picture)
            .set(Column::DocumentationBefore, self.documentation_before)
            .set(Column::DocumentationAfter, self.documentation_after)
            .finish()
    }
}

#[async_trait]
impl Record for Entity {
    const NAME: ModelName = ModelName::Rent;

    type Unique = RentWhereUnique;
    type Create = CreateRent;
    type Update = UpdateRent;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> Uuid {
        model.id
    }

    fn relations() -> &'static [&'static str] {
        &["user", "order"]
    }

    async fn load_relation<C>(conn: &C, model: &Model, relation: &str) -> ClientResult<Loaded>
    where
        C: ConnectionTrait,
    {
        Ok(match relation {
            "user" => Loaded::one(ModelName::User, model.find_related(Users).one(conn).await?),
            "order" => Loaded::one(ModelName::Order, model.find_related(Orders).one(conn).await?),
            other => return Err(unknown_relation(Self::NAME, other)),
        })
    }
}
