use serde::{Deserialize, Serialize};
use std::fmt;

pub const ERR_TOOL_UNAVAILABLE: &str = "ERR_TOOL_UNAVAILABLE";
pub const ERR_PROCESS_LAUNCH: &str = "ERR_PROCESS_LAUNCH";
pub const ERR_IO: &str = "ERR_IO";
pub const ERR_NOT_FOUND: &str = "ERR_NOT_FOUND";
pub const ERR_TIMEOUT: &str = "ERR_TIMEOUT";
pub const ERR_VALIDATION: &str = "ERR_VALIDATION";
pub const ERR_SYSTEM: &str = "ERR_SYSTEM";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    /// The external binary (adb or scrcpy) could not be resolved.
    pub fn tool_unavailable(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TOOL_UNAVAILABLE, message, trace_id)
    }

    /// The binary was resolved but the OS refused to start it.
    pub fn process_launch(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_PROCESS_LAUNCH, message, trace_id)
    }

    pub fn io(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_IO, message, trace_id)
    }

    pub fn not_found(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_NOT_FOUND, message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TIMEOUT, message, trace_id)
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_VALIDATION, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_SYSTEM, message, trace_id)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}
