use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::{
    config::{ClientConfig, LogLevel},
    error::{ClientError, ClientResult},
    migration::Migrator,
};

/// Create a SeaORM connection from the client configuration.
pub async fn create_orm_conn(config: &ClientConfig) -> ClientResult<DatabaseConnection> {
    let url = config.database_url()?;
    let mut options = ConnectOptions::new(url.to_owned());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(config.log.iter().any(|d| d.level == LogLevel::Query));
    if let Some(max) = config.max_connections {
        options.max_connections(max);
    }

    Database::connect(options)
        .await
        .map_err(|e| ClientError::Initialization(e.to_string()))
}

/// Apply every pending schema migration.
pub async fn run_migrations(conn: &DatabaseConnection) -> ClientResult<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}
