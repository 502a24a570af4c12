use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Execution requires confirmation")]
    ConfirmationRequired,

    #[error("Repaired SQL escalates safety from {from} to {to}")]
    SafetyEscalation { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for AdminError {
    fn from(err: sqlx::Error) -> Self {
        AdminError::Database(err.to_string())
    }
}

impl AdminError {
    /// HTTP status the server answers this error with
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::InvalidRequest(_) | AdminError::ConfirmationRequired => 400,
            AdminError::SafetyEscalation { .. } => 409,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
