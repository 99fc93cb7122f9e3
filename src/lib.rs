pub mod blacklist;
pub mod client;
pub mod config;
pub mod db;
pub mod delegate;
pub mod engine;
pub mod entity;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;

pub use client::{Client, Middleware, MiddlewareParams, Next, TxClient};
pub use config::{ClientConfig, TransactionOptions};
pub use engine::{Action, ModelName, Operation};
pub use error::{ClientError, ClientResult};
