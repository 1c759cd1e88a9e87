use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{code}: {message}")]
    Neo4j { code: String, message: String },

    #[error("malformed store response: {0}")]
    Malformed(String),

    #[error("store configuration: {0}")]
    Config(String),

    #[error("store client is closed")]
    Closed,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}
