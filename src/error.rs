use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),

    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),

    #[error("Vault error: {0}")]
    VaultError(#[from] VaultError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Implement conversion from sqlx::Error
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::CacheError(CacheError::NotFound),
            _ => AppError::CacheError(CacheError::QueryError(err.to_string())),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::CacheError(CacheError::SerializeError(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Failures talking to the generative-AI provider.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("API credentials missing")]
    MissingCredentials,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::RequestFailed(err.to_string())
        }
    }
}

/// Failures talking to the cloud store (rows, objects, auth).
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("No remote session")]
    NoSession,

    #[error("Session identity does not match requested user")]
    IdentityMismatch,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected response: {0}")]
    ResponseError(String),

    #[error("Cloud sync is not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        CloudError::RequestFailed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Serialization error: {0}")]
    SerializeError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CacheError::NotFound,
            _ => CacheError::QueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializeError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault is locked")]
    Locked,

    #[error("Verification denied")]
    VerificationDenied,

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),
}
