use astra::Response;
// errors.rs
use thiserror::Error;

use crate::alerts::mailer::MailerError;
use crate::mls::MlsError;

/// Errors originating from either the server logic
/// (routing, auth, missing resources) or downstream layers (DB, MLS feed, mail).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Mailer error: {0}")]
    Mailer(#[from] MailerError),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::Unauthorized => 401,
            ServerError::Conflict(_) => 409,
            ServerError::Config(_)
            | ServerError::DbError(_)
            | ServerError::Upstream(_)
            | ServerError::Mailer(_)
            | ServerError::InternalError => 500,
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

impl From<MlsError> for ServerError {
    fn from(e: MlsError) -> Self {
        match e {
            MlsError::MissingToken => ServerError::Config(e.to_string()),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;
