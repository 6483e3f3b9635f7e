//! Error types for Warden

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Realm Errors
    #[error("Bad realm configuration: {0}")]
    BadRealm(String),

    #[error("{0} realm does not exist")]
    NoSuchRealm(String),

    #[error("Operation not supported by this realm: {0}")]
    InvalidOperation(String),

    // Authentication Errors
    #[error("Login failed: {0}")]
    LoginFailed(#[from] LoginFailure),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a login attempt was refused.
///
/// All variants reach the caller as [`Error::LoginFailed`]; the kind is kept
/// for diagnostics only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    #[error("User {0} not found.")]
    UserNotFound(String),

    #[error("LDAP bind failed for {0}.")]
    BindFailed(String),

    #[error("Directory error: {0}")]
    Directory(String),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRealm(_) => "BadRealm",
            Error::NoSuchRealm(_) => "NoSuchRealm",
            Error::InvalidOperation(_) => "InvalidOperation",
            Error::LoginFailed(_) => "LoginFailed",
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// True for failures caused by the caller's credentials rather than the
    /// realm or its configuration.
    pub fn is_login_failure(&self) -> bool {
        matches!(self, Error::LoginFailed(_))
    }

    pub fn login_failure(&self) -> Option<&LoginFailure> {
        match self {
            Error::LoginFailed(failure) => Some(failure),
            _ => None,
        }
    }
}
