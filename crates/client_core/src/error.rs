//! Error taxonomy for remote calls and the user-facing notices derived from it.

use std::path::PathBuf;

use reqwest::StatusCode;
use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0} not found")]
    NotFound(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected by server: {0}")]
    Rejected(String),
    #[error("failed to read attachment {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid attachment {}: {reason}", path.display())]
    InvalidAttachment { path: PathBuf, reason: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Title and body of the modal shown for a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub title: &'static str,
    pub message: String,
}

impl ClientError {
    pub fn category(&self) -> ErrorCode {
        match self {
            ClientError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ClientError::Network(_) => ErrorCode::Network,
            ClientError::Timeout => ErrorCode::Timeout,
            ClientError::Validation(_)
            | ClientError::InvalidAttachment { .. }
            | ClientError::Io { .. } => ErrorCode::Validation,
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::Server { .. }
            | ClientError::Rejected(_)
            | ClientError::InvalidResponse(_)
            | ClientError::Config(_) => ErrorCode::Internal,
        }
    }

    pub fn user_notice(&self) -> UserNotice {
        match self {
            ClientError::PermissionDenied(what) => UserNotice {
                title: "Permiso denegado",
                message: format!("Se necesita acceso a {what} para continuar."),
            },
            ClientError::Network(_) | ClientError::Timeout => UserNotice {
                title: "Error de Conexión",
                message: "No se pudo comunicar con el servidor. Revisa tu conexión e inténtalo de nuevo."
                    .to_string(),
            },
            ClientError::Validation(fields) => UserNotice {
                title: "Campos requeridos",
                message: format!("Por favor, completa: {}.", fields.join(", ")),
            },
            ClientError::NotFound(what) => UserNotice {
                title: "Error",
                message: format!("No se encontró {what}."),
            },
            ClientError::Rejected(message) => UserNotice {
                title: "Error",
                message: message.clone(),
            },
            ClientError::Io { .. } | ClientError::InvalidAttachment { .. } => UserNotice {
                title: "Error",
                message: "No se pudo leer una de las fotos seleccionadas.".to_string(),
            },
            ClientError::Server { .. }
            | ClientError::InvalidResponse(_)
            | ClientError::Config(_) => UserNotice {
                title: "Error",
                message: "Hubo un problema con el servidor. Inténtalo de nuevo.".to_string(),
            },
        }
    }

    pub fn user_message(&self) -> String {
        self.user_notice().message
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCode::Network | ErrorCode::Timeout | ErrorCode::Internal
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            if status == StatusCode::NOT_FOUND {
                ClientError::NotFound(err.url().map(|u| u.path().to_string()).unwrap_or_default())
            } else {
                ClientError::Server {
                    status: status.as_u16(),
                    message: err.to_string(),
                }
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
