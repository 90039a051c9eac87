//! Error types for mailgate

use thiserror::Error;

/// Result type alias using mailgate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailgate
#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    // Mail store errors
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Calendar not available")]
    CalendarUnavailable,

    // Bridge / transport errors
    #[error("Request to mail client timed out")]
    Timeout,

    #[error("Cannot read auth token from {path}: {reason}. Is the mail client running with the gateway enabled?")]
    Token { path: String, reason: String },

    #[error("Connection failed: {0}. Is the mail client running with the gateway enabled?")]
    Connection(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // I/O and serialization
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns the JSON-RPC error code for this error.
    ///
    /// Transport-level failures (the bridge could not reach the gateway, or
    /// could not make sense of what came back) use the parse-error code so
    /// the agent can tell them apart from tool execution failures.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Error::Timeout
            | Error::Token { .. }
            | Error::Connection(_)
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_) => -32700,
            _ => -32000,
        }
    }

    /// Returns true for conditions the agent should inspect rather than
    /// treat as a failed call: these are reported inside a successful tool
    /// result as an `error` field, never as a JSON-RPC error.
    pub fn is_tool_condition(&self) -> bool {
        matches!(
            self,
            Error::FolderNotFound(_) | Error::MessageNotFound(_) | Error::CalendarUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_to_parse_error_code() {
        assert_eq!(Error::Timeout.rpc_code(), -32700);
        assert_eq!(
            Error::Connection("refused".to_string()).rpc_code(),
            -32700
        );
        assert_eq!(Error::ToolNotFound("x".to_string()).rpc_code(), -32000);
    }

    #[test]
    fn soft_conditions_are_tool_level() {
        assert!(Error::FolderNotFound("f".to_string()).is_tool_condition());
        assert!(Error::MessageNotFound("m".to_string()).is_tool_condition());
        assert!(Error::CalendarUnavailable.is_tool_condition());
        assert!(!Error::InvalidRequest("bad".to_string()).is_tool_condition());
    }
}
