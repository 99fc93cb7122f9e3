use std::{collections::HashMap, env, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    engine::ModelName,
    error::{ClientError, ClientResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFormat {
    Pretty,
    #[default]
    Colorless,
    Minimal,
}

impl std::str::FromStr for ErrorFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(ErrorFormat::Pretty),
            "colorless" => Ok(ErrorFormat::Colorless),
            "minimal" => Ok(ErrorFormat::Minimal),
            other => Err(ClientError::Initialization(format!(
                "unknown error format `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Query,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEmit {
    #[default]
    Stdout,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDefinition {
    pub level: LogLevel,
    #[serde(default)]
    pub emit: LogEmit,
}

impl LogDefinition {
    pub fn stdout(level: LogLevel) -> Self {
        Self {
            level,
            emit: LogEmit::Stdout,
        }
    }

    pub fn event(level: LogLevel) -> Self {
        Self {
            level,
            emit: LogEmit::Event,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<IsolationLevel> for sea_orm::IsolationLevel {
    fn from(level: IsolationLevel) -> Self {
        match level {
            IsolationLevel::ReadUncommitted => sea_orm::IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => sea_orm::IsolationLevel::Serializable,
        }
    }
}

/// Limits applied to interactive transactions.
///
/// `max_wait` bounds how long beginning the transaction may take, `timeout` bounds the
/// whole callback. Both serialize as milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    #[serde(with = "millis")]
    pub max_wait: Duration,
    #[serde(with = "millis")]
    pub timeout: Duration,
    #[serde(default)]
    pub isolation_level: Option<IsolationLevel>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(2_000),
            timeout: Duration::from_millis(5_000),
            isolation_level: None,
        }
    }
}

impl TransactionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasources {
    pub db: Datasource,
}

/// Construction-time settings for [`crate::client::Client`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default)]
    pub datasources: Option<Datasources>,
    #[serde(default)]
    pub datasource_url: Option<String>,
    #[serde(default)]
    pub error_format: ErrorFormat,
    #[serde(default)]
    pub log: Vec<LogDefinition>,
    #[serde(default)]
    pub transaction_options: TransactionOptions,
    /// Fields stripped from every payload of the given model.
    #[serde(default)]
    pub omit: HashMap<ModelName, Vec<String>>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl ClientConfig {
    pub fn new(datasource_url: impl Into<String>) -> Self {
        Self {
            datasource_url: Some(datasource_url.into()),
            ..Default::default()
        }
    }

    pub fn from_env() -> ClientResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ClientError::Initialization("DATABASE_URL is not set".into()))?;

        let mut config = Self::new(database_url);
        if let Ok(format) = env::var("ERROR_FORMAT") {
            config.error_format = format.parse()?;
        }
        if env::var("LOG_QUERIES").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
            config.log.push(LogDefinition::stdout(LogLevel::Query));
        }
        if let Some(ms) = env::var("TX_MAX_WAIT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.transaction_options.max_wait = Duration::from_millis(ms);
        }
        if let Some(ms) = env::var("TX_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.transaction_options.timeout = Duration::from_millis(ms);
        }
        config.max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok());
        Ok(config)
    }

    /// Resolve the connection URL. Exactly one of `datasources.db.url` and
    /// `datasource_url` must be set.
    pub fn database_url(&self) -> ClientResult<&str> {
        match (&self.datasources, &self.datasource_url) {
            (Some(_), Some(_)) => Err(ClientError::Initialization(
                "`datasources` and `datasourceUrl` cannot be used together".into(),
            )),
            (Some(sources), None) => Ok(sources.db.url.as_str()),
            (None, Some(url)) => Ok(url.as_str()),
            (None, None) => Err(ClientError::Initialization(
                "no datasource URL configured".into(),
            )),
        }
    }

    pub fn with_error_format(mut self, format: ErrorFormat) -> Self {
        self.error_format = format;
        self
    }

    pub fn with_log(mut self, definition: LogDefinition) -> Self {
        self.log.push(definition);
        self
    }

    pub fn with_transaction_options(mut self, options: TransactionOptions) -> Self {
        self.transaction_options = options;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn omit<I, S>(mut self, model: ModelName, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit
            .entry(model)
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn omitted(&self, model: ModelName) -> &[String] {
        self.omit.get(&model).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Settings for the query server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client = ClientConfig::from_env()?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;
        let run_migrations = env::var("RUN_MIGRATIONS").is_ok_and(|v| v == "1" || v == "true");
        Ok(Self {
            client,
            host,
            port,
            jwt_secret,
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasource_url_resolution() {
        let config = ClientConfig::new("sqlite::memory:");
        assert_eq!(config.database_url().unwrap(), "sqlite::memory:");

        let both = ClientConfig {
            datasources: Some(Datasources {
                db: Datasource {
                    url: "postgres://a".into(),
                },
            }),
            ..ClientConfig::new("postgres://b")
        };
        assert!(matches!(
            both.database_url(),
            Err(ClientError::Initialization(_))
        ));

        assert!(ClientConfig::default().database_url().is_err());
    }

    #[test]
    fn config_deserializes_from_camel_case_json() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "datasources": { "db": { "url": "postgres://localhost/rental" } },
            "errorFormat": "minimal",
            "log": [{ "level": "query", "emit": "event" }, { "level": "warn" }],
            "transactionOptions": { "maxWait": 100, "timeout": 250, "isolationLevel": "Serializable" },
            "omit": { "User": ["password"] }
        }))
        .unwrap();

        assert_eq!(config.error_format, ErrorFormat::Minimal);
        assert_eq!(config.log[0], LogDefinition::event(LogLevel::Query));
        assert_eq!(config.log[1].emit, LogEmit::Stdout);
        assert_eq!(
            config.transaction_options.timeout,
            Duration::from_millis(250)
        );
        assert_eq!(
            config.transaction_options.isolation_level,
            Some(IsolationLevel::Serializable)
        );
        assert_eq!(config.omitted(ModelName::User), ["password".to_string()]);
        assert!(config.omitted(ModelName::Team).is_empty());
    }

    #[test]
    fn error_format_parses_case_insensitively() {
        assert_eq!("PRETTY".parse::<ErrorFormat>().unwrap(), ErrorFormat::Pretty);
        assert!("loud".parse::<ErrorFormat>().is_err());
    }
}
