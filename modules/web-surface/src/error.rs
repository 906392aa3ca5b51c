use hunter_core::Irrelevant;
use thiserror::Error;

/// Every way a single path probe can end without a recorded result.
#[derive(Debug, Error)]
pub enum PathError {
    #[error(transparent)]
    Irrelevant(#[from] Irrelevant),
    #[error("too many requests on {url}")]
    RateLimited { url: String },
    #[error("port is cooling down after a 429")]
    CoolingDown,
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
