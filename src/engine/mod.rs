//! Runs operation descriptors (`{model, action, args}`) against the delegates.

pub mod args;
pub mod operation;
mod payload;

use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

pub use operation::{Action, ModelName, Operation};

use self::{
    args::{
        aggregate_selection, count_select, decode, find_many, group_by, object, required, unique,
        where_,
    },
    payload::Shape,
};
use crate::{
    client::{MiddlewareParams, raw},
    config::ClientConfig,
    delegate::Delegate,
    entity::{
        CartOnItems, Carts, Categories, OrderOnProducts, Orders, Products, Rents, Teams,
        TokenBlacklist, Users,
    },
    error::{ClientError, ClientResult},
    logging::Logger,
    query::{AggregateArgs, CountArgs},
    schema::{Record, to_json},
};

/// What an operation runs against.
pub(crate) struct Context<'a, D> {
    pub db: &'a D,
    pub logger: &'a Logger,
    pub config: &'a ClientConfig,
}

impl<D> Clone for Context<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Context<'_, D> {}

const FIND_MANY: &[&str] = &[
    "where", "orderBy", "cursor", "take", "skip", "distinct", "select", "include", "omit",
];
const AGGREGATES: &[&str] = &["_count", "_avg", "_sum", "_min", "_max"];

/// Route one operation to its model's delegate, or to raw SQL.
pub(crate) async fn dispatch<D>(ctx: Context<'_, D>, params: MiddlewareParams) -> ClientResult<JsonValue>
where
    D: ConnectionTrait + TransactionTrait,
{
    let MiddlewareParams {
        model, action, args, ..
    } = params;

    let model = match action {
        Action::QueryRaw | Action::ExecuteRaw => return run_raw(ctx, action, &args).await,
        _ => model.ok_or_else(|| {
            ClientError::validation(format!("`model` is required for `{action}`"))
        })?,
    };

    match model {
        ModelName::TokenBlacklist => run::<TokenBlacklist, D>(ctx, action, &args).await,
        ModelName::Team => run::<Teams, D>(ctx, action, &args).await,
        ModelName::User => run::<Users, D>(ctx, action, &args).await,
        ModelName::Rent => run::<Rents, D>(ctx, action, &args).await,
        ModelName::Order => run::<Orders, D>(ctx, action, &args).await,
        ModelName::Product => run::<Products, D>(ctx, action, &args).await,
        ModelName::OrderOnProduct => run::<OrderOnProducts, D>(ctx, action, &args).await,
        ModelName::Category => run::<Categories, D>(ctx, action, &args).await,
        ModelName::Cart => run::<Carts, D>(ctx, action, &args).await,
        ModelName::CartOnItem => run::<CartOnItems, D>(ctx, action, &args).await,
    }
}

async fn run_raw<D>(ctx: Context<'_, D>, action: Action, args: &JsonValue) -> ClientResult<JsonValue>
where
    D: ConnectionTrait,
{
    let map = object(args, &["query", "parameters"])?;
    let sql = required(map, "query")?
        .as_str()
        .ok_or_else(|| ClientError::validation("`query` must be a string"))?;
    let values = raw::parameters(map.get("parameters"))?;
    match action {
        Action::QueryRaw => Ok(JsonValue::Array(
            raw::query(ctx.db, ctx.logger, sql, values).await?,
        )),
        _ => Ok(JsonValue::from(
            raw::execute(ctx.db, ctx.logger, sql, values).await?,
        )),
    }
}

fn data<T: DeserializeOwned>(map: &serde_json::Map<String, JsonValue>, key: &str) -> ClientResult<T> {
    decode(key, required(map, key)?)
}

async fn run<R, D>(ctx: Context<'_, D>, action: Action, args: &JsonValue) -> ClientResult<JsonValue>
where
    R: Record,
    D: ConnectionTrait + TransactionTrait,
{
    let delegate = Delegate::<R, D>::new(ctx.db, ctx.logger);

    match action {
        Action::FindUnique | Action::FindUniqueOrThrow => {
            let map = object(args, &["where", "select", "include", "omit"])?;
            let shape = Shape::parse::<R>(map)?;
            let unique = unique::<R>(map)?;
            let row = if action == Action::FindUnique {
                delegate.find_unique(unique).await?
            } else {
                Some(delegate.find_unique_or_throw(unique).await?)
            };
            match row {
                Some(row) => shape.render::<R, D>(ctx.db, ctx.config, &row).await,
                None => Ok(JsonValue::Null),
            }
        }
        Action::FindFirst | Action::FindFirstOrThrow => {
            let map = object(args, FIND_MANY)?;
            let shape = Shape::parse::<R>(map)?;
            let query = find_many::<R>(map)?;
            let row = if action == Action::FindFirst {
                delegate.find_first(query).await?
            } else {
                Some(delegate.find_first_or_throw(query).await?)
            };
            match row {
                Some(row) => shape.render::<R, D>(ctx.db, ctx.config, &row).await,
                None => Ok(JsonValue::Null),
            }
        }
        Action::FindMany => {
            let map = object(args, FIND_MANY)?;
            let shape = Shape::parse::<R>(map)?;
            let rows = delegate.find_many(find_many::<R>(map)?).await?;
            shape.render_all::<R, D>(ctx.db, ctx.config, &rows).await
        }
        Action::Create => {
            let map = object(args, &["data", "select", "include", "omit"])?;
            let shape = Shape::parse::<R>(map)?;
            let row = delegate.create(data(map, "data")?).await?;
            shape.render::<R, D>(ctx.db, ctx.config, &row).await
        }
        Action::CreateMany => {
            let map = object(args, &["data", "skipDuplicates"])?;
            let rows: Vec<R::Create> = match required(map, "data")? {
                single @ JsonValue::Object(_) => vec![decode("data", single)?],
                many => decode("data", many)?,
            };
            let skip = map
                .get("skipDuplicates")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            Ok(to_json(&delegate.create_many(rows, skip).await?))
        }
        Action::Update => {
            let map = object(args, &["where", "data", "select", "include", "omit"])?;
            let shape = Shape::parse::<R>(map)?;
            let row = delegate
                .update(unique::<R>(map)?, data(map, "data")?)
                .await?;
            shape.render::<R, D>(ctx.db, ctx.config, &row).await
        }
        Action::UpdateMany => {
            let map = object(args, &["where", "data"])?;
            let payload = delegate
                .update_many(where_::<R>(map)?, data(map, "data")?)
                .await?;
            Ok(to_json(&payload))
        }
        Action::Upsert => {
            let map = object(
                args,
                &["where", "create", "update", "select", "include", "omit"],
            )?;
            let shape = Shape::parse::<R>(map)?;
            let row = delegate
                .upsert(
                    unique::<R>(map)?,
                    data(map, "create")?,
                    data(map, "update")?,
                )
                .await?;
            shape.render::<R, D>(ctx.db, ctx.config, &row).await
        }
        Action::Delete => {
            let map = object(args, &["where", "select", "include", "omit"])?;
            let shape = Shape::parse::<R>(map)?;
            // Relations are gone once the row is deleted, so shape from the loaded row first.
            let target = delegate.find_unique_or_throw(unique::<R>(map)?).await?;
            let rendered = shape.render::<R, D>(ctx.db, ctx.config, &target).await?;
            delegate.delete(unique::<R>(map)?).await?;
            Ok(rendered)
        }
        Action::DeleteMany => {
            let map = object(args, &["where"])?;
            Ok(to_json(&delegate.delete_many(where_::<R>(map)?).await?))
        }
        Action::Count => {
            let map = object(
                args,
                &["where", "orderBy", "cursor", "take", "skip", "distinct", "select"],
            )?;
            let paged = map.keys().any(|k| k != "where" && k != "select");
            match count_select::<R::Column>(map)? {
                Some(fields) => {
                    let counts = delegate
                        .count_fields(CountArgs {
                            query: find_many::<R>(map)?,
                            select: fields,
                        })
                        .await?;
                    Ok(to_json(&counts))
                }
                None if paged => {
                    let counts = delegate
                        .count_fields(CountArgs {
                            query: find_many::<R>(map)?,
                            select: Vec::new(),
                        })
                        .await?;
                    Ok(JsonValue::from(counts.get("_all").copied().unwrap_or(0)))
                }
                None => Ok(JsonValue::from(delegate.count(where_::<R>(map)?).await?)),
            }
        }
        Action::Aggregate => {
            let allowed: Vec<&str> = ["where", "orderBy", "cursor", "take", "skip"]
                .into_iter()
                .chain(AGGREGATES.iter().copied())
                .collect();
            let map = object(args, &allowed)?;
            let result = delegate
                .aggregate(AggregateArgs {
                    query: find_many::<R>(map)?,
                    select: aggregate_selection(map)?,
                })
                .await?;
            Ok(to_json(&result))
        }
        Action::GroupBy => {
            let allowed: Vec<&str> = ["by", "where", "having", "orderBy", "take", "skip"]
                .into_iter()
                .chain(AGGREGATES.iter().copied())
                .collect();
            let map = object(args, &allowed)?;
            let rows = delegate.group_by(group_by::<R>(map)?).await?;
            Ok(to_json(&rows))
        }
        Action::QueryRaw | Action::ExecuteRaw => Err(ClientError::validation(format!(
            "`{action}` does not take a model"
        ))),
    }
}
