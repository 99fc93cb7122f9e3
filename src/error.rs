use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::ErrorFormat,
    engine::{Action, ModelName},
    response::{ApiResponse, Meta},
};

/// Broad family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    KnownRequest,
    UnknownRequest,
    Initialization,
    Validation,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{cause}")]
    NotFound {
        model: Option<ModelName>,
        cause: String,
    },

    #[error("Unique constraint failed on {target}")]
    UniqueConstraintViolation {
        model: Option<ModelName>,
        target: String,
    },

    #[error("Foreign key constraint failed: {detail}")]
    ForeignKeyViolation {
        model: Option<ModelName>,
        detail: String,
    },

    #[error("Transaction timed out after {timeout_ms} ms")]
    TransactionTimeout { timeout_ms: u64 },

    #[error("Unable to start a transaction within {max_wait_ms} ms")]
    TransactionStart { max_wait_ms: u64 },

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Client initialization failed: {0}")]
    Initialization(String),

    #[error("Database error: {0}")]
    Orm(DbErr),
}

impl ClientError {
    pub fn not_found(model: ModelName, cause: impl Into<String>) -> Self {
        ClientError::NotFound {
            model: Some(model),
            cause: cause.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Attach the model to constraint errors raised below the delegate.
    pub fn with_model(self, name: ModelName) -> Self {
        match self {
            ClientError::NotFound { model: None, cause } => ClientError::NotFound {
                model: Some(name),
                cause,
            },
            ClientError::UniqueConstraintViolation {
                model: None,
                target,
            } => ClientError::UniqueConstraintViolation {
                model: Some(name),
                target,
            },
            ClientError::ForeignKeyViolation {
                model: None,
                detail,
            } => ClientError::ForeignKeyViolation {
                model: Some(name),
                detail,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotFound { .. }
            | ClientError::UniqueConstraintViolation { .. }
            | ClientError::ForeignKeyViolation { .. }
            | ClientError::TransactionTimeout { .. }
            | ClientError::TransactionStart { .. } => ErrorKind::KnownRequest,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::Initialization(_) => ErrorKind::Initialization,
            ClientError::Orm(_) => ErrorKind::UnknownRequest,
        }
    }

    /// Stable, machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::NotFound { .. } => "NOT_FOUND",
            ClientError::UniqueConstraintViolation { .. } => "UNIQUE_VIOLATION",
            ClientError::ForeignKeyViolation { .. } => "FOREIGN_KEY_VIOLATION",
            ClientError::TransactionTimeout { .. } => "TRANSACTION_TIMEOUT",
            ClientError::TransactionStart { .. } => "TRANSACTION_START_TIMEOUT",
            ClientError::Validation(_) => "VALIDATION",
            ClientError::Initialization(_) => "INITIALIZATION",
            ClientError::Orm(_) => "UNKNOWN_REQUEST",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ClientError::UniqueConstraintViolation { .. })
    }

    /// Render for humans. `invocation` names the delegate call that failed, if known.
    pub fn render(&self, format: ErrorFormat, invocation: Option<(ModelName, Action)>) -> String {
        let message = self.to_string();
        if format == ErrorFormat::Minimal {
            return message;
        }

        let header = match invocation {
            Some((model, action)) => format!(
                "Invalid `client.{}.{}()` invocation:",
                model.delegate_name(),
                action
            ),
            None => "Invalid client invocation:".to_string(),
        };

        match format {
            ErrorFormat::Pretty => format!("\u{1b}[31m{header}\u{1b}[0m\n\n\u{1b}[1m{message}\u{1b}[0m"),
            _ => format!("{header}\n\n{message}"),
        }
    }
}

impl From<DbErr> for ClientError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(target)) => {
                return ClientError::UniqueConstraintViolation {
                    model: None,
                    target,
                };
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return ClientError::ForeignKeyViolation {
                    model: None,
                    detail,
                };
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(cause) => ClientError::NotFound { model: None, cause },
            other => ClientError::Orm(other),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the HTTP query server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A failed operation, with its message rendered in the configured error format.
    #[error("{rendered}")]
    Invocation {
        source: ClientError,
        rendered: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    code: &'static str,
    error: String,
}

impl AppError {
    pub fn invocation(
        error: ClientError,
        format: ErrorFormat,
        invocation: Option<(ModelName, Action)>,
    ) -> Self {
        let rendered = error.render(format, invocation);
        AppError::Invocation {
            source: error,
            rendered,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Client(err) | AppError::Invocation { source: err, .. } => match err {
                ClientError::NotFound { .. } => StatusCode::NOT_FOUND,
                ClientError::UniqueConstraintViolation { .. }
                | ClientError::ForeignKeyViolation { .. } => StatusCode::CONFLICT,
                ClientError::Validation(_) => StatusCode::BAD_REQUEST,
                ClientError::TransactionTimeout { .. } | ClientError::TransactionStart { .. } => {
                    StatusCode::REQUEST_TIMEOUT
                }
                ClientError::Initialization(_) | ClientError::Orm(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Client(err) | AppError::Invocation { source: err, .. } => err.code(),
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ApiResponse {
            message: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            data: Some(ErrorData {
                code: self.code(),
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_format_is_just_the_message() {
        let err = ClientError::not_found(ModelName::User, "No User found");
        let rendered = err.render(
            ErrorFormat::Minimal,
            Some((ModelName::User, Action::FindUniqueOrThrow)),
        );
        assert_eq!(rendered, "No User found");
    }

    #[test]
    fn colorless_format_names_the_invocation() {
        let err = ClientError::validation("`select` and `include` cannot be combined");
        let rendered = err.render(
            ErrorFormat::Colorless,
            Some((ModelName::CartOnItem, Action::FindMany)),
        );
        assert!(rendered.starts_with("Invalid `client.cartOnItem.findMany()` invocation:"));
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn pretty_format_uses_ansi_colour() {
        let err = ClientError::TransactionTimeout { timeout_ms: 5000 };
        assert!(err.render(ErrorFormat::Pretty, None).contains('\u{1b}'));
    }

    #[test]
    fn with_model_fills_only_missing_model() {
        let err = ClientError::UniqueConstraintViolation {
            model: None,
            target: "users.email".into(),
        }
        .with_model(ModelName::User);
        assert!(matches!(
            err,
            ClientError::UniqueConstraintViolation {
                model: Some(ModelName::User),
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::KnownRequest);
        assert_eq!(err.code(), "UNIQUE_VIOLATION");
    }

    #[test]
    fn record_not_found_maps_to_not_found() {
        let err: ClientError = DbErr::RecordNotFound("gone".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn app_error_status_codes() {
        assert_eq!(
            AppError::from(ClientError::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(ClientError::UniqueConstraintViolation {
                model: None,
                target: "x".into()
            })
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn invocation_keeps_status_and_rendered_message() {
        let err = AppError::invocation(
            ClientError::not_found(ModelName::Team, "No Team found"),
            ErrorFormat::Colorless,
            Some((ModelName::Team, Action::FindUniqueOrThrow)),
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().starts_with("Invalid `client.team.findUniqueOrThrow()`"));
    }
}
