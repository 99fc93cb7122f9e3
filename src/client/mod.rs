//! The top-level client: delegate accessors, transactions, raw SQL and middleware.

mod middleware;
pub(crate) mod raw;

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, RwLock},
    time::Duration,
};

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait, Value,
};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

pub use middleware::{Middleware, MiddlewareParams, Next};
pub(crate) use middleware::{Chain, empty_chain};

use crate::{
    config::{ClientConfig, TransactionOptions},
    db::{create_orm_conn, run_migrations},
    delegate::Delegate,
    engine::{self, Context, Operation},
    entity::{
        CartOnItems, Carts, Categories, OrderOnProducts, Orders, Products, Rents, Teams,
        TokenBlacklist, Users,
    },
    error::{ClientError, ClientResult},
    logging::{LogEvent, Logger},
    schema::Record,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const TARGET: &str = "client";

struct ClientInner {
    conn: DatabaseConnection,
    config: ClientConfig,
    logger: Logger,
    middleware: RwLock<Chain>,
}

/// Handle to the database. Cheap to clone; clones share the pool and middleware.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// The client's accessors bound to one open transaction.
#[derive(Clone, Copy)]
pub struct TxClient<'c> {
    txn: &'c DatabaseTransaction,
    logger: &'c Logger,
    config: &'c ClientConfig,
    middleware: &'c [Arc<dyn Middleware>],
}

macro_rules! delegates {
    ($($name:ident => $record:ty),* $(,)?) => {
        impl Client {
            $(
                pub fn $name(&self) -> Delegate<'_, $record, DatabaseConnection> {
                    self.delegate::<$record>()
                }
            )*
        }

        impl<'c> TxClient<'c> {
            $(
                pub fn $name(&self) -> Delegate<'c, $record, DatabaseTransaction> {
                    self.delegate::<$record>()
                }
            )*
        }
    };
}

delegates! {
    token_blacklist => TokenBlacklist,
    team => Teams,
    user => Users,
    rent => Rents,
    order => Orders,
    product => Products,
    order_on_product => OrderOnProducts,
    category => Categories,
    cart => Carts,
    cart_on_item => CartOnItems,
}

impl Client {
    /// Open the pool described by `config`.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let conn = create_orm_conn(&config).await?;
        let logger = Logger::new(&config.log);
        logger.info(TARGET, "connected");
        tracing::info!(error_format = ?config.error_format, "client connected");

        Ok(Self {
            inner: Arc::new(ClientInner {
                conn,
                config,
                logger,
                middleware: RwLock::new(empty_chain()),
            }),
        })
    }

    pub async fn migrate(&self) -> ClientResult<()> {
        run_migrations(&self.inner.conn).await?;
        self.inner.logger.info(TARGET, "migrations applied");
        Ok(())
    }

    /// Close the pool. Every clone of this client is disconnected with it.
    pub async fn disconnect(&self) -> ClientResult<()> {
        self.inner.conn.clone().close().await?;
        self.inner.logger.info(TARGET, "disconnected");
        Ok(())
    }

    pub async fn ping(&self) -> ClientResult<()> {
        Ok(self.inner.conn.ping().await?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.inner.conn
    }

    /// Receive log events for the levels configured with `emit: event`.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.inner.logger.subscribe()
    }

    /// A delegate for `R` whose calls pass through the registered middleware.
    pub fn delegate<R: Record>(&self) -> Delegate<'_, R, DatabaseConnection> {
        Delegate::new(&self.inner.conn, &self.inner.logger).with_middleware(self.middleware(), false)
    }

    /// Append a middleware. The first registered runs outermost.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        let mut chain = self
            .inner
            .middleware
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = chain.to_vec();
        next.push(middleware);
        *chain = Arc::from(next);
    }

    fn middleware(&self) -> Chain {
        self.inner
            .middleware
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn context(&self) -> Context<'_, DatabaseConnection> {
        Context {
            db: &self.inner.conn,
            logger: &self.inner.logger,
            config: &self.inner.config,
        }
    }

    /// Run one operation descriptor through the middleware chain.
    pub async fn execute(&self, op: Operation) -> ClientResult<JsonValue> {
        let chain = self.middleware();
        run_chain(
            self.context(),
            &chain,
            MiddlewareParams::from_operation(op, false),
        )
        .await
    }

    /// Run every operation in one transaction, in order. Any failure rolls all of
    /// them back.
    pub async fn batch(&self, ops: Vec<Operation>) -> ClientResult<Vec<JsonValue>> {
        let count = ops.len();
        let results = self
            .transaction(None, move |tx| {
                Box::pin(async move {
                    let mut results = Vec::with_capacity(ops.len());
                    for op in ops {
                        results.push(tx.execute(op).await?);
                    }
                    Ok::<_, ClientError>(results)
                })
            })
            .await?;
        tracing::debug!(operations = count, "batch committed");
        Ok(results)
    }

    /// Run `f` in an interactive transaction. Commits if `f` returns `Ok`, rolls back
    /// otherwise, and rolls back with [`ClientError::TransactionTimeout`] if `f`
    /// outlives `options.timeout`. `None` uses the configured defaults.
    pub async fn transaction<F, T>(
        &self,
        options: Option<TransactionOptions>,
        f: F,
    ) -> ClientResult<T>
    where
        F: for<'c> FnOnce(TxClient<'c>) -> BoxFuture<'c, ClientResult<T>> + Send,
        T: Send,
    {
        let options = options.unwrap_or(self.inner.config.transaction_options);
        let begin = self
            .inner
            .conn
            .begin_with_config(options.isolation_level.map(Into::into), None);
        let txn = tokio::time::timeout(options.max_wait, begin)
            .await
            .map_err(|_| ClientError::TransactionStart {
                max_wait_ms: millis(options.max_wait),
            })??;

        let chain = self.middleware();
        let tx = TxClient {
            txn: &txn,
            logger: &self.inner.logger,
            config: &self.inner.config,
            middleware: &chain,
        };
        let outcome = tokio::time::timeout(options.timeout, f(tx)).await;

        match outcome {
            Ok(Ok(value)) => {
                txn.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback(txn).await;
                Err(err)
            }
            Err(_) => {
                self.rollback(txn).await;
                let timeout_ms = millis(options.timeout);
                self.inner
                    .logger
                    .warn(TARGET, &format!("transaction timed out after {timeout_ms} ms"));
                Err(ClientError::TransactionTimeout { timeout_ms })
            }
        }
    }

    async fn rollback(&self, txn: DatabaseTransaction) {
        if let Err(err) = txn.rollback().await {
            tracing::warn!(error = %err, "rollback failed");
            self.inner.logger.error(TARGET, &err.to_string());
        }
    }

    /// Bind the delegates to a transaction opened elsewhere. Middleware is not applied.
    pub fn with_tx<'c>(&'c self, txn: &'c DatabaseTransaction) -> TxClient<'c> {
        TxClient {
            txn,
            logger: &self.inner.logger,
            config: &self.inner.config,
            middleware: &[],
        }
    }

    pub async fn query_raw(&self, sql: &str, values: Vec<Value>) -> ClientResult<Vec<JsonValue>> {
        raw::query(&self.inner.conn, &self.inner.logger, sql, values).await
    }

    pub async fn execute_raw(&self, sql: &str, values: Vec<Value>) -> ClientResult<u64> {
        raw::execute(&self.inner.conn, &self.inner.logger, sql, values).await
    }

    /// Run `sql` as-is. Never build it from untrusted input.
    pub async fn query_raw_unsafe(&self, sql: &str) -> ClientResult<Vec<JsonValue>> {
        raw::query_unsafe(&self.inner.conn, &self.inner.logger, sql).await
    }

    pub async fn execute_raw_unsafe(&self, sql: &str) -> ClientResult<u64> {
        raw::execute_unsafe(&self.inner.conn, &self.inner.logger, sql).await
    }
}

impl<'c> TxClient<'c> {
    pub fn delegate<R: Record>(&self) -> Delegate<'c, R, DatabaseTransaction> {
        Delegate::new(self.txn, self.logger).with_middleware(Arc::from(self.middleware), true)
    }

    pub fn transaction(&self) -> &'c DatabaseTransaction {
        self.txn
    }

    /// Run one operation descriptor inside this transaction.
    pub async fn execute(&self, op: Operation) -> ClientResult<JsonValue> {
        let ctx = Context {
            db: self.txn,
            logger: self.logger,
            config: self.config,
        };
        run_chain(ctx, self.middleware, MiddlewareParams::from_operation(op, true)).await
    }

    pub async fn query_raw(&self, sql: &str, values: Vec<Value>) -> ClientResult<Vec<JsonValue>> {
        raw::query(self.txn, self.logger, sql, values).await
    }

    pub async fn execute_raw(&self, sql: &str, values: Vec<Value>) -> ClientResult<u64> {
        raw::execute(self.txn, self.logger, sql, values).await
    }
}

async fn run_chain<D>(
    ctx: Context<'_, D>,
    chain: &[Arc<dyn Middleware>],
    params: MiddlewareParams,
) -> ClientResult<JsonValue>
where
    D: ConnectionTrait + TransactionTrait + Sync,
{
    let terminal = move |params: MiddlewareParams| {
        let fut: BoxFuture<'_, ClientResult<JsonValue>> = Box::pin(engine::dispatch(ctx, params));
        fut
    };
    Next::new(chain, &terminal).run(params).await
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
