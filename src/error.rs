use chrono::NaiveDate;
use thiserror::Error;

/// Stable error category that callers can branch on.
///
/// | Range     | Category     |
/// |-----------|--------------|
/// | 1000–1999 | Validation   |
/// | 2000–2999 | Lookup/State |
/// | 3000–3999 | Booking      |
/// | 5000–5999 | Infra        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Pricing,
    Availability,
    Store,
    Config,
}

impl ErrorKind {
    pub const fn code(self) -> u32 {
        match self {
            Self::BadRequest => 1001,
            Self::NotFound => 2001,
            Self::Conflict => 2002,
            Self::Pricing => 3001,
            Self::Availability => 3002,
            Self::Store => 5001,
            Self::Config => 5002,
        }
    }

    pub const fn category(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Pricing => "pricing_error",
            Self::Availability => "availability_error",
            Self::Store => "store_error",
            Self::Config => "config_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.category())
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid request: {reason}")]
    BadRequest { reason: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("No price available for night {date}")]
    Pricing { date: NaiveDate },

    #[error("Villa is not available on {date}")]
    Availability { date: NaiveDate },

    #[error("Store request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Store returned an unexpected response: {reason}")]
    Store { reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl BookingError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Pricing { .. } => ErrorKind::Pricing,
            Self::Availability { .. } => ErrorKind::Availability,
            Self::Timeout { .. }
            | Self::StoreUnavailable { .. }
            | Self::Store { .. }
            | Self::Http(_)
            | Self::Json(_) => ErrorKind::Store,
            Self::Config(_) | Self::Io(_) | Self::Yaml(_) | Self::Url(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::StoreUnavailable { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
