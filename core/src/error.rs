use thiserror::Error;

/// Faults detected before any work starts. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max connections must be at least {min} (got {got})")]
    TooFewConnections { min: usize, got: usize },
    #[error("invalid port list {spec:?}: {reason}")]
    InvalidPorts { spec: String, reason: String },
    #[error("cannot read wordlist {path}: {source}")]
    Wordlist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reason a probe outcome is deliberately left out of the results.
/// Not a fault: callers log it at debug level and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Irrelevant {
    #[error("filtered status {0}")]
    Status(u16),
    #[error("redirected off-host to {0}")]
    OffHost(String),
    #[error("duplicate final path {0}")]
    Duplicate(String),
    #[error("uninteresting content type {0}")]
    ContentType(String),
    #[error("bot challenge page {0:?}")]
    BotChallenge(String),
}
