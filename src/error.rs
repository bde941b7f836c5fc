#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Missing required configuration key '{0}'")]
    MissingConfigKey(&'static str),

    #[error("Configuration key '{0}' must not be empty")]
    EmptyConfigKey(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("Cannot parse document: {0}")]
    Parse(String),

    #[error("HTTP error")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::error::Error),
}

/// Failure while resolving one field. Never leaves the container scanner.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("step {0} has no tag")]
    MissingTag(usize),

    #[error("invalid tag '{0}'")]
    InvalidTag(String),

    #[error("unreadable field definition: {0}")]
    InvalidDefinition(String),

    #[error("cannot resolve link '{href}'")]
    Link {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, ScraperError>;
