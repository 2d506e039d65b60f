use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ConsoleError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        ConsoleError::NotFound { entity, id }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ConsoleError::Storage {
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        ConsoleError::Api {
            message: message.into(),
        }
    }

    /// Transport and upstream failures are worth another attempt; everything
    /// else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsoleError::Http(_) | ConsoleError::Api { .. })
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ConsoleError::NotFound { .. } => "NOT_FOUND",
            ConsoleError::Validation(_) => "BAD_USER_INPUT",
            ConsoleError::Conflict(_) => "CONFLICT",
            ConsoleError::Unauthorized(_) => "UNAUTHENTICATED",
            ConsoleError::Forbidden(_) => "FORBIDDEN",
            ConsoleError::Http(_) | ConsoleError::Api { .. } => "UPSTREAM_ERROR",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
