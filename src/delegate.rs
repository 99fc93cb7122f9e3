//! The per-model delegate: CRUD, aggregation and relation reads for one entity.

use std::{collections::HashSet, future::Future, marker::PhantomData, time::Instant};

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, IdenStatic, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Related, Select, TransactionTrait,
    sea_query::SimpleExpr,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    client::{BoxFuture, Chain, MiddlewareParams, Next, empty_chain},
    engine::{Action, ModelName},
    error::{ClientError, ClientResult},
    logging::Logger,
    query::{
        AggregateArgs, AggregateResult, AggregateSelection, BatchPayload, CountArgs, CountResult,
        FindManyArgs, GroupByArgs, GroupByRow, OrderBy, Where,
    },
    schema::{CreateInput, Record, Unique, UpdateInput, now, to_json},
};

/// Operations on one model, bound to a connection or an open transaction.
///
/// Calls made through a delegate handed out by [`Client`](crate::Client) or
/// [`TxClient`](crate::TxClient) pass through the registered middleware. The
/// middleware sees the call as `{model, action, args}` with `args` in the JSON
/// argument shape; the typed arguments are what actually run.
pub struct Delegate<'a, R, C> {
    conn: &'a C,
    logger: &'a Logger,
    chain: Chain,
    in_transaction: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R, C> Clone for Delegate<'_, R, C> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            logger: self.logger,
            chain: self.chain.clone(),
            in_transaction: self.in_transaction,
            _record: PhantomData,
        }
    }
}

impl<'a, R, C> Delegate<'a, R, C>
where
    R: Record,
    C: ConnectionTrait + TransactionTrait,
{
    /// A delegate without middleware.
    pub(crate) fn new(conn: &'a C, logger: &'a Logger) -> Self {
        Self {
            conn,
            logger,
            chain: empty_chain(),
            in_transaction: false,
            _record: PhantomData,
        }
    }

    pub(crate) fn with_middleware(mut self, chain: Chain, in_transaction: bool) -> Self {
        self.chain = chain;
        self.in_transaction = in_transaction;
        self
    }

    async fn observe<T, F>(&self, model: ModelName, action: Action, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();

        let statement = format!("{model}.{action}");
        self.logger.query(model.as_str(), &statement, elapsed);
        match &result {
            Ok(_) => tracing::debug!(%model, %action, ms = %elapsed.as_millis(), "operation finished"),
            Err(err) => {
                tracing::debug!(%model, %action, error = %err, "operation failed");
                self.logger.error(model.as_str(), &err.to_string());
            }
        }
        result.map_err(|e| e.with_model(model))
    }

    /// Run `op` at the end of the middleware chain. A middleware may short-circuit
    /// with its own result, which must have the shape `op` would have returned.
    /// Calling `next` twice runs `op` twice.
    async fn intercept<T, A, Op, F>(
        &self,
        model: ModelName,
        action: Action,
        args: A,
        op: Op,
    ) -> ClientResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        A: FnOnce() -> JsonValue,
        Op: Fn() -> F + Send + Sync,
        F: Future<Output = ClientResult<T>> + Send,
    {
        if self.chain.is_empty() {
            return self.observe(model, action, op()).await;
        }

        let params = MiddlewareParams {
            model: Some(model),
            action,
            args: args(),
            data_path: Vec::new(),
            run_in_transaction: self.in_transaction,
        };
        let terminal = |_: MiddlewareParams| {
            let run = self.observe(model, action, op());
            let fut: BoxFuture<'_, ClientResult<JsonValue>> = Box::pin(async move {
                let value = run.await?;
                serde_json::to_value(value).map_err(|e| {
                    ClientError::validation(format!("{model}.{action} result is not JSON: {e}"))
                })
            });
            fut
        };
        let value = Next::new(&self.chain, &terminal).run(params).await?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::validation(format!(
                "middleware returned a value that is not a {model}.{action} result: {e}"
            ))
        })
    }

    pub async fn find_unique(&self, unique: impl Into<Unique<R>>) -> ClientResult<Option<R::Model>> {
        let unique: &Unique<R> = &unique.into();
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::FindUnique,
            || args([("where", unique.to_json())]),
            move || fetch_unique::<R, _>(conn, unique),
        )
        .await
    }

    pub async fn find_unique_or_throw(&self, unique: impl Into<Unique<R>>) -> ClientResult<R::Model> {
        let unique: &Unique<R> = &unique.into();
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::FindUniqueOrThrow,
            || args([("where", unique.to_json())]),
            move || async move {
                fetch_unique::<R, _>(conn, unique)
                    .await?
                    .ok_or_else(missing::<R>)
            },
        )
        .await
    }

    pub async fn find_first(&self, query: FindManyArgs<R>) -> ClientResult<Option<R::Model>> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::FindFirst,
            || query.to_json(),
            move || first::<R, _>(conn, query.clone()),
        )
        .await
    }

    pub async fn find_first_or_throw(&self, query: FindManyArgs<R>) -> ClientResult<R::Model> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::FindFirstOrThrow,
            || query.to_json(),
            move || async move {
                first::<R, _>(conn, query.clone())
                    .await?
                    .ok_or_else(missing::<R>)
            },
        )
        .await
    }

    pub async fn find_many(&self, query: FindManyArgs<R>) -> ClientResult<Vec<R::Model>> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::FindMany,
            || query.to_json(),
            move || find_many_from::<R, _>(conn, R::find(), query.clone()),
        )
        .await
    }

    /// Rows of `T` related to `parent`, with the usual filter, sort and pagination.
    /// Middleware sees this as `findMany` on `T`.
    pub async fn find_related<T>(
        &self,
        parent: &R::Model,
        query: FindManyArgs<T>,
    ) -> ClientResult<Vec<T::Model>>
    where
        T: Record,
        R: Related<T>,
    {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            T::NAME,
            Action::FindMany,
            || query.to_json(),
            move || find_many_from::<T, _>(conn, parent.find_related(T::default()), query.clone()),
        )
        .await
    }

    /// First related row, for to-one relations.
    pub async fn find_related_first<T>(&self, parent: &R::Model) -> ClientResult<Option<T::Model>>
    where
        T: Record,
        R: Related<T>,
    {
        let rows = self
            .find_related::<T>(parent, FindManyArgs::new().take(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn create(&self, data: R::Create) -> ClientResult<R::Model> {
        let data = &data;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Create,
            || args([("data", to_json(data))]),
            move || insert::<R, _>(conn, data.clone()),
        )
        .await
    }

    /// Insert every row atomically. With `skip_duplicates`, rows that hit a unique
    /// constraint are skipped and not counted.
    pub async fn create_many(
        &self,
        data: Vec<R::Create>,
        skip_duplicates: bool,
    ) -> ClientResult<BatchPayload> {
        let data = &data;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::CreateMany,
            || {
                args([
                    ("data", to_json(data)),
                    ("skipDuplicates", JsonValue::Bool(skip_duplicates)),
                ])
            },
            move || insert_many::<R, _>(conn, data.clone(), skip_duplicates),
        )
        .await
    }

    /// Update the row selected by `unique`. Never creates.
    pub async fn update(
        &self,
        unique: impl Into<Unique<R>>,
        data: R::Update,
    ) -> ClientResult<R::Model> {
        let unique: &Unique<R> = &unique.into();
        let data = &data;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Update,
            || args([("where", unique.to_json()), ("data", to_json(data))]),
            move || async move {
                let txn = conn.begin().await?;
                let row = fetch_unique::<R, _>(&txn, unique)
                    .await?
                    .ok_or_else(missing::<R>)?;
                let updated = update_by_id::<R, _>(&txn, R::id_of(&row), data.clone()).await?;
                txn.commit().await?;
                Ok(updated)
            },
        )
        .await
    }

    pub async fn update_many(
        &self,
        where_: Where<R::Column>,
        data: R::Update,
    ) -> ClientResult<BatchPayload> {
        let (where_, data) = (&where_, &data);
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::UpdateMany,
            || args([("where", where_.to_json()), ("data", to_json(data))]),
            move || async move {
                let count =
                    apply_update::<R, _>(conn, where_.clone().into_condition(), data.clone())
                        .await?;
                Ok(BatchPayload { count })
            },
        )
        .await
    }

    /// Create the row if `unique` matches nothing, otherwise update it.
    pub async fn upsert(
        &self,
        unique: impl Into<Unique<R>>,
        create: R::Create,
        update: R::Update,
    ) -> ClientResult<R::Model> {
        let unique: &Unique<R> = &unique.into();
        let (create, update) = (&create, &update);
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Upsert,
            || {
                args([
                    ("where", unique.to_json()),
                    ("create", to_json(create)),
                    ("update", to_json(update)),
                ])
            },
            move || async move {
                let txn = conn.begin().await?;
                let row = match fetch_unique::<R, _>(&txn, unique).await? {
                    Some(existing) => {
                        update_by_id::<R, _>(&txn, R::id_of(&existing), update.clone()).await?
                    }
                    None => insert::<R, _>(&txn, create.clone()).await?,
                };
                txn.commit().await?;
                Ok(row)
            },
        )
        .await
    }

    /// Delete the row selected by `unique` and return it.
    pub async fn delete(&self, unique: impl Into<Unique<R>>) -> ClientResult<R::Model> {
        let unique: &Unique<R> = &unique.into();
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Delete,
            || args([("where", unique.to_json())]),
            move || async move {
                let txn = conn.begin().await?;
                let row = fetch_unique::<R, _>(&txn, unique)
                    .await?
                    .ok_or_else(missing::<R>)?;
                R::delete_many()
                    .filter(R::id_column().eq(R::id_of(&row)))
                    .exec(&txn)
                    .await?;
                txn.commit().await?;
                Ok(row)
            },
        )
        .await
    }

    pub async fn delete_many(&self, where_: Where<R::Column>) -> ClientResult<BatchPayload> {
        let where_ = &where_;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::DeleteMany,
            || args([("where", where_.to_json())]),
            move || async move {
                let result = R::delete_many()
                    .filter(where_.clone().into_condition())
                    .exec(conn)
                    .await?;
                Ok(BatchPayload {
                    count: result.rows_affected,
                })
            },
        )
        .await
    }

    pub async fn count(&self, where_: Where<R::Column>) -> ClientResult<u64> {
        let where_ = &where_;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Count,
            || args([("where", where_.to_json())]),
            move || async move {
                Ok(R::find()
                    .filter(where_.clone().into_condition())
                    .count(conn)
                    .await?)
            },
        )
        .await
    }

    /// `_all` plus the number of non-null values of each selected field.
    pub async fn count_fields(&self, query: CountArgs<R>) -> ClientResult<CountResult> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Count,
            || query.to_json(),
            move || async move {
                let rows = find_many_from::<R, _>(conn, R::find(), query.query.clone()).await?;
                let selection = AggregateSelection {
                    count_all: true,
                    count: query.select.clone(),
                    ..AggregateSelection::default()
                };
                Ok(selection
                    .compute(&json_rows::<R>(&rows))
                    .count
                    .unwrap_or_default())
            },
        )
        .await
    }

    pub async fn aggregate(&self, query: AggregateArgs<R>) -> ClientResult<AggregateResult> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::Aggregate,
            || query.to_json(),
            move || async move {
                query.select.validate()?;
                let rows = find_many_from::<R, _>(conn, R::find(), query.query.clone()).await?;
                Ok(query.select.compute(&json_rows::<R>(&rows)))
            },
        )
        .await
    }

    pub async fn group_by(&self, query: GroupByArgs<R>) -> ClientResult<Vec<GroupByRow>> {
        let query = &query;
        let conn = self.conn;
        self.intercept(
            R::NAME,
            Action::GroupBy,
            || query.to_json(),
            move || async move {
                query.validate()?;
                let rows = R::find()
                    .filter(query.where_.clone().into_condition())
                    .order_by_asc(R::id_column())
                    .all(conn)
                    .await?;
                query.compute(&json_rows::<R>(&rows))
            },
        )
        .await
    }
}

/// An argument object from `(key, value)` pairs.
fn args<const N: usize>(entries: [(&str, JsonValue); N]) -> JsonValue {
    JsonValue::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

fn missing<R: Record>() -> ClientError {
    ClientError::not_found(R::NAME, format!("No {} found", R::NAME))
}

fn json_rows<R: Record>(rows: &[R::Model]) -> Vec<JsonValue> {
    rows.iter().map(to_json).collect()
}

async fn fetch_unique<R, D>(db: &D, unique: &Unique<R>) -> ClientResult<Option<R::Model>>
where
    R: Record,
    D: ConnectionTrait,
{
    Ok(R::find().filter(unique.condition()).one(db).await?)
}

async fn fetch_by_id<R, D>(db: &D, id: Uuid) -> ClientResult<Option<R::Model>>
where
    R: Record,
    D: ConnectionTrait,
{
    Ok(R::find().filter(R::id_column().eq(id)).one(db).await?)
}

async fn insert_row<R, D>(db: &D, data: R::Create) -> ClientResult<()>
where
    R: Record,
    D: ConnectionTrait,
{
    let (_, model) = data.into_active_model();
    R::insert(model).exec(db).await?;
    Ok(())
}

async fn insert_many<R, D>(
    db: &D,
    data: Vec<R::Create>,
    skip_duplicates: bool,
) -> ClientResult<BatchPayload>
where
    R: Record,
    D: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let mut count = 0;
    for input in data {
        if !skip_duplicates {
            insert_row::<R, _>(&txn, input).await?;
            count += 1;
            continue;
        }
        let savepoint = txn.begin().await?;
        match insert_row::<R, _>(&savepoint, input).await {
            Ok(()) => {
                savepoint.commit().await?;
                count += 1;
            }
            Err(err) if err.is_unique_violation() => savepoint.rollback().await?,
            Err(err) => return Err(err),
        }
    }
    txn.commit().await?;
    Ok(BatchPayload { count })
}

async fn insert<R, D>(db: &D, data: R::Create) -> ClientResult<R::Model>
where
    R: Record,
    D: ConnectionTrait,
{
    let (id, model) = data.into_active_model();
    R::insert(model).exec(db).await?;
    fetch_by_id::<R, _>(db, id)
        .await?
        .ok_or_else(|| ClientError::not_found(R::NAME, format!("created {} was not readable", R::NAME)))
}

async fn update_by_id<R, D>(db: &D, id: Uuid, data: R::Update) -> ClientResult<R::Model>
where
    R: Record,
    D: ConnectionTrait,
{
    apply_update::<R, _>(db, Condition::all().add(R::id_column().eq(id)), data).await?;
    fetch_by_id::<R, _>(db, id).await?.ok_or_else(missing::<R>)
}

/// Run one `UPDATE` over the rows matching `condition`, refreshing `updated_at`.
async fn apply_update<R, D>(db: &D, condition: Condition, data: R::Update) -> ClientResult<u64>
where
    R: Record,
    D: ConnectionTrait,
{
    let mut exprs = data.into_exprs();
    if let Some(column) = R::updated_at_column() {
        if !exprs.iter().any(|(c, _)| c.as_str() == column.as_str()) {
            exprs.push((column, SimpleExpr::Value(now().into())));
        }
    }
    if exprs.is_empty() {
        return Ok(R::find().filter(condition).count(db).await?);
    }

    let mut statement = R::update_many().filter(condition);
    for (column, expr) in exprs {
        statement = statement.col_expr(column, expr);
    }
    Ok(statement.exec(db).await?.rows_affected)
}

async fn first<R, D>(db: &D, args: FindManyArgs<R>) -> ClientResult<Option<R::Model>>
where
    R: Record,
    D: ConnectionTrait,
{
    let take = match args.take {
        Some(t) if t < 0 => -1,
        _ => 1,
    };
    let rows = find_many_from::<R, _>(db, R::find(), FindManyArgs { take: Some(take), ..args }).await?;
    Ok(rows.into_iter().next())
}

/// Apply filter, ordering, cursor, distinct and pagination to `select`.
///
/// Ordering always ends with the primary key so pages are stable. Cursor and distinct
/// need the ordered row set, so they are resolved after fetching.
pub(crate) async fn find_many_from<R, D>(
    db: &D,
    select: Select<R>,
    args: FindManyArgs<R>,
) -> ClientResult<Vec<R::Model>>
where
    R: Record,
    D: ConnectionTrait,
{
    let FindManyArgs {
        where_,
        mut order_by,
        cursor,
        take,
        skip,
        distinct,
    } = args;

    let backwards = take.is_some_and(|t| t < 0);
    let id = R::id_column();
    if !order_by.iter().any(|o| o.column.as_str() == id.as_str()) {
        order_by.push(OrderBy::asc(id));
    }

    let mut select = select.filter(where_.into_condition());
    for order in &order_by {
        let direction = if backwards {
            order.order.reverse()
        } else {
            order.order
        };
        select = select.order_by(order.column, direction.as_order());
    }
    let limit = take.map(i64::unsigned_abs);

    if cursor.is_none() && distinct.is_empty() {
        if let Some(skip) = skip {
            select = select.offset(skip);
        }
        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        let mut rows = select.all(db).await?;
        if backwards {
            rows.reverse();
        }
        return Ok(rows);
    }

    let mut rows = select.all(db).await?;

    if !distinct.is_empty() {
        let mut seen = HashSet::new();
        rows.retain(|row| {
            let json = to_json(row);
            let key: Vec<&JsonValue> = distinct
                .iter()
                .map(|c| json.get(c.as_str()).unwrap_or(&JsonValue::Null))
                .collect();
            seen.insert(serde_json::to_string(&key).unwrap_or_default())
        });
    }

    if let Some(cursor) = cursor {
        let Some(anchor) = fetch_unique::<R, _>(db, &cursor).await? else {
            return Ok(Vec::new());
        };
        let anchor_id = R::id_of(&anchor);
        match rows.iter().position(|row| R::id_of(row) == anchor_id) {
            Some(pos) => {
                rows.drain(..pos);
            }
            None => return Ok(Vec::new()),
        }
    }

    let mut rows: Vec<_> = rows
        .into_iter()
        .skip(skip.unwrap_or(0) as usize)
        .take(limit.map_or(usize::MAX, |l| l as usize))
        .collect();
    if backwards {
        rows.reverse();
    }
    Ok(rows)
}
