use thiserror::Error;

#[derive(Debug, Error)]
pub enum MlsError {
    #[error("MLS_ACCESS_TOKEN environment variable not set")]
    MissingToken,
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("MLS feed returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Could not decode feed page: {0}")]
    Decode(String),
}
