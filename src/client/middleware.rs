use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::BoxFuture;
use crate::{
    engine::{Action, ModelName, Operation},
    error::ClientResult,
};

/// What a middleware sees for each operation, typed or descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareParams {
    pub model: Option<ModelName>,
    pub action: Action,
    pub args: JsonValue,
    pub data_path: Vec<String>,
    pub run_in_transaction: bool,
}

impl MiddlewareParams {
    pub fn from_operation(op: Operation, run_in_transaction: bool) -> Self {
        Self {
            model: op.model,
            action: op.action,
            args: op.args,
            data_path: Vec::new(),
            run_in_transaction,
        }
    }
}

/// Intercepts operations. Call `next.run(params)` to continue down the chain, or
/// return without calling it to short-circuit.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, params: MiddlewareParams, next: Next<'_>) -> ClientResult<JsonValue>;
}

/// Registered middleware, outermost first.
pub(crate) type Chain = Arc<[Arc<dyn Middleware>]>;

pub(crate) fn empty_chain() -> Chain {
    Arc::from(Vec::new())
}

pub(crate) type Terminal<'a> =
    dyn Fn(MiddlewareParams) -> BoxFuture<'a, ClientResult<JsonValue>> + Send + Sync + 'a;

/// The rest of the chain, ending with the operation itself.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], terminal: &'a Terminal<'a>) -> Self {
        Self { chain, terminal }
    }

    pub async fn run(self, params: MiddlewareParams) -> ClientResult<JsonValue> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.handle(params, Next::new(rest, self.terminal))
                    .await
            }
            None => (self.terminal)(params).await,
        }
    }
}
