use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogDefinition, LogEmit, LogLevel};

/// Install the global tracing subscriber used by the binaries.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rental_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Routes client log lines to tracing and/or subscribers, per the `log` config.
#[derive(Debug, Clone)]
pub struct Logger {
    stdout: Vec<LogLevel>,
    events: Vec<LogLevel>,
    sender: broadcast::Sender<LogEvent>,
}

impl Logger {
    pub fn new(definitions: &[LogDefinition]) -> Self {
        let (sender, _) = broadcast::channel(256);
        let mut stdout = Vec::new();
        let mut events = Vec::new();
        for definition in definitions {
            match definition.emit {
                LogEmit::Stdout => stdout.push(definition.level),
                LogEmit::Event => events.push(definition.level),
            }
        }
        Self {
            stdout,
            events,
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }

    pub fn query(&self, target: &str, statement: &str, elapsed: Duration) {
        tracing::debug!(target: "rental_client::query", model = %target, ms = %elapsed.as_millis(), "{statement}");
        self.emit(LogLevel::Query, target, statement, Some(elapsed));
    }

    pub fn info(&self, target: &str, message: &str) {
        self.emit(LogLevel::Info, target, message, None);
    }

    pub fn warn(&self, target: &str, message: &str) {
        self.emit(LogLevel::Warn, target, message, None);
    }

    pub fn error(&self, target: &str, message: &str) {
        self.emit(LogLevel::Error, target, message, None);
    }

    fn emit(&self, level: LogLevel, target: &str, message: &str, elapsed: Option<Duration>) {
        if self.stdout.contains(&level) {
            match level {
                LogLevel::Query | LogLevel::Info => {
                    tracing::info!(target: "rental_client", model = %target, "{message}")
                }
                LogLevel::Warn => tracing::warn!(target: "rental_client", model = %target, "{message}"),
                LogLevel::Error => {
                    tracing::error!(target: "rental_client", model = %target, "{message}")
                }
            }
        }

        if self.events.contains(&level) {
            // No receivers is fine: events are best-effort.
            let _ = self.sender.send(LogEvent {
                level,
                timestamp: Utc::now(),
                target: target.to_string(),
                message: message.to_string(),
                duration_ms: elapsed.map(|d| d.as_millis() as u64),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_levels_reach_subscribers() {
        let logger = Logger::new(&[
            LogDefinition::event(LogLevel::Query),
            LogDefinition::stdout(LogLevel::Warn),
        ]);
        let mut rx = logger.subscribe();

        logger.warn("User", "stdout only");
        logger.query("User", "User.findMany", Duration::from_millis(3));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.level, LogLevel::Query);
        assert_eq!(event.message, "User.findMany");
        assert_eq!(event.duration_ms, Some(3));
        assert!(rx.try_recv().is_err());
    }
}
