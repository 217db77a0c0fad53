//! Error types for routing and controller execution.

use thiserror::Error;

/// Application error codes carried in JSON error envelopes.
pub struct ErrorCode;

impl ErrorCode {
    /// The session expired or is invalid.
    pub const SESSION_EXPIRED_OR_INVALID_SESSION: i64 = 1;
    /// No access token was supplied.
    pub const NO_ACCESS_TOKEN: i64 = 2;
    /// An upstream request returned an invalid response.
    pub const UPSTREAM_INVALID_RESPONSE: i64 = 4;
    /// The failure is on our side.
    pub const OUR_FAULT: i64 = 5;
    /// Request parameters failed to bind.
    pub const INVALID_PARAMS: i64 = 6;
    /// No specific code.
    pub const UNSPECIFIED: i64 = -1;
}

/// Configuration errors raised while building the routing tables.
///
/// These are fatal: a dispatcher that fails to build must not serve.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A route template could not be compiled.
    #[error("invalid route template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A hook references an identifier that is not a registered listener.
    #[error("listener not found: {0}")]
    UnknownHook(String),

    /// No controller is registered under the resolved artifact.
    #[error("unknown controller target: {0}")]
    UnknownTarget(String),

    /// A state-changing verb resolved to a controller without the mutator capability.
    #[error("{0} must be registered as a mutator controller")]
    NotMutator(String),

    /// Route name not found.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// A mandatory route parameter was not supplied while generating a URL.
    #[error("{0} is a mandatory parameter")]
    MissingRouteParam(String),
}

/// Errors raised while binding request data to declared parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// A required parameter is absent.
    #[error("Param is required: {0}")]
    Missing(String),

    /// A parameter is present but could not be coerced.
    #[error("Wrong type: {key}")]
    WrongType { key: String, expected: &'static str },
}

impl ParamError {
    /// Returns the offending parameter name.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing(key) | Self::WrongType { key, .. } => key,
        }
    }
}

/// Per-request errors. These never escape the lifecycle: they are
/// rendered into a response in whichever mode the client negotiated.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Parameter binding failed.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// The controller halted its own flow.
    #[error("{message}")]
    Halt { message: String, code: i64 },

    /// No endpoint exists for the requested path.
    #[error("Invalid endpoint: {0}")]
    NotFound(String),

    /// Misconfiguration discovered during dispatch.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Any other failure raised by controller code.
    #[error("{0}")]
    Failed(String),
}

impl ControllerError {
    /// Creates a halt error with no specific code.
    pub fn halt(message: impl Into<String>) -> Self {
        Self::Halt {
            message: message.into(),
            code: ErrorCode::UNSPECIFIED,
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// The application error code reported to JSON clients.
    pub fn code(&self) -> i64 {
        match self {
            Self::Params(_) => ErrorCode::INVALID_PARAMS,
            Self::Halt { code, .. } => *code,
            Self::NotFound(_) => ErrorCode::UNSPECIFIED,
            Self::Router(_) | Self::Failed(_) => ErrorCode::OUR_FAULT,
        }
    }

    /// The HTTP status used when the controller does not override it.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_error_messages() {
        assert_eq!(
            ParamError::Missing("id".into()).to_string(),
            "Param is required: id"
        );
        let err = ParamError::WrongType {
            key: "age".into(),
            expected: "int",
        };
        assert_eq!(err.to_string(), "Wrong type: age");
        assert_eq!(err.key(), "age");
    }

    #[test]
    fn test_controller_error_codes() {
        let err = ControllerError::from(ParamError::Missing("id".into()));
        assert_eq!(err.code(), ErrorCode::INVALID_PARAMS);
        assert_eq!(err.status(), 500);

        let err = ControllerError::Halt {
            message: "quota exceeded".into(),
            code: 42,
        };
        assert_eq!(err.code(), 42);
        assert_eq!(err.to_string(), "quota exceeded");

        let err = ControllerError::NotFound("/nope".into());
        assert_eq!(err.status(), 404);
        assert_eq!(err.to_string(), "Invalid endpoint: /nope");
    }
}
