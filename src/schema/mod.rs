//! Per-model inputs: unique selectors, create payloads and update payloads.

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, EntityTrait, Value,
    prelude::DateTimeWithTimeZone,
    sea_query::{Condition, SimpleExpr},
};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{
    engine::ModelName,
    entity::{
        CartOnItems, Carts, Categories, OrderOnProducts, Orders, Products, Rents, Teams,
        TokenBlacklist, Users,
    },
    error::{ClientError, ClientResult},
    query::{NumberUpdate, Where},
};

pub mod cart_on_items;
pub mod carts;
pub mod categories;
pub mod order_on_products;
pub mod orders;
pub mod products;
pub mod rents;
pub mod teams;
pub mod token_blacklist;
pub mod users;

pub use cart_on_items::{CartOnItemWhereUnique, CreateCartOnItem, UpdateCartOnItem};
pub use carts::{CartWhereUnique, CreateCart, UpdateCart};
pub use categories::{CategoryWhereUnique, CreateCategory, UpdateCategory};
pub use order_on_products::{CreateOrderOnProduct, OrderOnProductWhereUnique, UpdateOrderOnProduct};
pub use orders::{CreateOrder, OrderWhereUnique, UpdateOrder};
pub use products::{CreateProduct, ProductWhereUnique, UpdateProduct};
pub use rents::{CreateRent, RentWhereUnique, UpdateRent};
pub use teams::{CreateTeam, TeamWhereUnique, UpdateTeam};
pub use token_blacklist::{CreateTokenBlacklist, TokenBlacklistWhereUnique, UpdateTokenBlacklist};
pub use users::{CreateUser, UpdateUser, UserWhereUnique};

/// An entity the client exposes a delegate for.
#[async_trait]
pub trait Record: EntityTrait<Model: Serialize + DeserializeOwned + Sync> {
    const NAME: ModelName;

    type Unique: UniqueWhere;
    type Create: CreateInput<Self>;
    type Update: UpdateInput<Self>;

    fn id_column() -> Self::Column;

    fn id_of(model: &Self::Model) -> Uuid;

    /// Column refreshed to now by every update, if the model tracks one.
    fn updated_at_column() -> Option<Self::Column> {
        None
    }

    /// Relation names accepted by `include`.
    fn relations() -> &'static [&'static str] {
        &[]
    }

    /// Load one relation of `model`: an object (or null) for to-one relations,
    /// a list for to-many relations.
    async fn load_relation<C>(
        conn: &C,
        model: &Self::Model,
        relation: &str,
    ) -> ClientResult<Loaded>
    where
        C: ConnectionTrait;
}

/// A loaded relation, tagged with the model it holds so payload shaping can apply `omit`.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub model: ModelName,
    pub value: JsonValue,
}

impl Loaded {
    pub fn one<M: Serialize>(model: ModelName, row: Option<M>) -> Self {
        Self {
            model,
            value: row.map(|r| to_json(&r)).unwrap_or(JsonValue::Null),
        }
    }

    pub fn many<M: Serialize>(model: ModelName, rows: Vec<M>) -> Self {
        Self {
            model,
            value: JsonValue::Array(rows.iter().map(to_json).collect()),
        }
    }
}

pub fn to_json<M: Serialize>(model: &M) -> JsonValue {
    serde_json::to_value(model).unwrap_or(JsonValue::Null)
}

pub fn unknown_relation(model: ModelName, relation: &str) -> ClientError {
    ClientError::validation(format!("unknown relation `{relation}` on {model}"))
}

/// One unique key of a model. Each variant names a field (or compound key) that
/// identifies at most one row.
pub trait UniqueWhere:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    fn condition(&self) -> Condition;
}

/// Selector for single-row operations: a unique key, optionally narrowed by
/// filters on any other fields. Plain keys convert with `.into()`.
pub struct Unique<R: Record> {
    pub key: R::Unique,
    pub rest: Option<Where<R::Column>>,
}

impl<R: Record> Clone for Unique<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            rest: self.rest.clone(),
        }
    }
}

impl<R: Record> std::fmt::Debug for Unique<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unique")
            .field("key", &self.key)
            .field("rest", &self.rest)
            .finish()
    }
}

impl<R: Record> Unique<R> {
    pub fn new(key: R::Unique) -> Self {
        Self { key, rest: None }
    }

    /// AND another filter onto the selector.
    pub fn and(mut self, filter: Where<R::Column>) -> Self {
        self.rest = Some(match self.rest {
            Some(rest) => rest.and(filter),
            None => filter,
        });
        self
    }

    pub fn condition(&self) -> Condition {
        let key = self.key.condition();
        match &self.rest {
            Some(rest) => key.add(rest.clone().into_condition()),
            None => key,
        }
    }

    /// Parse `{"id": ..., "name": ...}`: the first entry that reads as a unique key
    /// becomes the key, every other entry is a regular filter.
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        let JsonValue::Object(map) = json else {
            return Err(ClientError::validation(format!(
                "`where` must be an object, got {json}"
            )));
        };

        let mut key = None;
        let mut rest = Map::new();
        for (name, value) in map {
            if key.is_none() {
                let single = JsonValue::Object(Map::from_iter([(name.clone(), value.clone())]));
                if let Ok(parsed) = serde_json::from_value::<R::Unique>(single) {
                    key = Some(parsed);
                    continue;
                }
            }
            rest.insert(name.clone(), value.clone());
        }

        let key = key.ok_or_else(|| {
            ClientError::validation(format!(
                "`where` on {} must include at least one unique field",
                R::NAME
            ))
        })?;
        let rest = if rest.is_empty() {
            None
        } else {
            Some(Where::from_json(&JsonValue::Object(rest))?)
        };
        Ok(Self { key, rest })
    }

    /// The selector in its JSON argument shape.
    pub fn to_json(&self) -> JsonValue {
        let mut map = match to_json(&self.key) {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(JsonValue::Object(rest)) = self.rest.as_ref().map(Where::to_json) {
            map.extend(rest);
        }
        JsonValue::Object(map)
    }
}

macro_rules! unique_keys {
    ($($key:ty => $record:ty),* $(,)?) => {
        $(
            impl From<$key> for Unique<$record> {
                fn from(key: $key) -> Self {
                    Unique::new(key)
                }
            }
        )*
    };
}

unique_keys! {
    CartOnItemWhereUnique => CartOnItems,
    CartWhereUnique => Carts,
    CategoryWhereUnique => Categories,
    OrderOnProductWhereUnique => OrderOnProducts,
    OrderWhereUnique => Orders,
    ProductWhereUnique => Products,
    RentWhereUnique => Rents,
    TeamWhereUnique => Teams,
    TokenBlacklistWhereUnique => TokenBlacklist,
    UserWhereUnique => Users,
}

pub trait CreateInput<R: EntityTrait>:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Build the row to insert, filling client-side defaults. Returns the row id.
    fn into_active_model(self) -> (Uuid, R::ActiveModel);
}

pub trait UpdateInput<R: EntityTrait>:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    fn into_exprs(self) -> Vec<(R::Column, SimpleExpr)>;
}

pub fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().fixed_offset()
}

/// Accumulates `SET` expressions for an update.
pub(crate) struct Assignments<C>(Vec<(C, SimpleExpr)>);

impl<C: sea_orm::ColumnTrait> Assignments<C> {
    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn set<V: Into<Value>>(&mut self, column: C, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.0.push((column, SimpleExpr::Value(v.into())));
        }
        self
    }

    pub(crate) fn number<T: Into<Value>>(
        &mut self,
        column: C,
        update: Option<NumberUpdate<T>>,
    ) -> &mut Self {
        if let Some(update) = update {
            self.0.push((column, update.into_expr(column)));
        }
        self
    }

    pub(crate) fn finish(&mut self) -> Vec<(C, SimpleExpr)> {
        std::mem::take(&mut self.0)
    }
}

/// Distinguishes an absent field from an explicit `null` on nullable update fields.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
