use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::app::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Adb,
    Scrcpy,
}

impl CommandKind {
    /// Field marker used in the catalog line grammar.
    pub fn marker(self) -> &'static str {
        match self {
            CommandKind::Adb => "ADB_COMMAND",
            CommandKind::Scrcpy => "SCRCPY_COMMAND",
        }
    }

    pub fn catalog_file_name(self) -> &'static str {
        match self {
            CommandKind::Adb => "adb_commands.txt",
            CommandKind::Scrcpy => "scrcpy_commands.txt",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Adb => "adb",
            CommandKind::Scrcpy => "scrcpy",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "adb" => Ok(CommandKind::Adb),
            "scrcpy" => Ok(CommandKind::Scrcpy),
            other => Err(format!("unknown command kind: {other}")),
        }
    }
}

/// A named command template. Edits are modelled as remove + append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandEntry {
    pub title: String,
    pub kind: CommandKind,
    pub template: String,
}

impl CommandEntry {
    pub fn new(kind: CommandKind, title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            kind,
            template: template.into().trim().to_string(),
        }
    }

    /// Whitespace tokens of the template, handed to the process as-is.
    pub fn template_tokens(&self) -> Vec<String> {
        self.template
            .split_whitespace()
            .map(|token| token.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Ready,
    Offline,
    Unauthorized,
    Other(String),
}

impl DeviceState {
    pub fn from_token(token: &str) -> Self {
        match token {
            "device" => DeviceState::Ready,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Ready => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Other(value) => value,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DeviceState::Ready)
    }
}

impl Serialize for DeviceState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(DeviceState::from_token(&value))
    }
}

/// One row of `adb devices -l`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: DeviceState,
    pub model: Option<String>,
    pub product: Option<String>,
    pub transport_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub serial: String,
    pub state: DeviceState,
    pub android_version: Option<String>,
    pub model: Option<String>,
}

impl Device {
    pub fn target(&self) -> DeviceTarget {
        DeviceTarget::new(self.serial.clone())
    }
}

/// The device an action is aimed at, captured when the action is requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceTarget {
    pub serial: String,
}

impl DeviceTarget {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ExitStatus::Success,
            _ => ExitStatus::Failure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub serial: String,
    pub exit_status: ExitStatus,
    pub exit_code: Option<i32>,
    pub combined_output: String,
    pub duration_ms: u64,
}

/// A launched scrcpy window. Its lifetime belongs to the OS once spawned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessHandle {
    pub serial: String,
    pub pid: u32,
    pub program: String,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Captured(ExecutionResult),
    Detached(ProcessHandle),
}

/// Per-device result of running one entry across several devices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRunReport {
    pub serial: String,
    pub outcome: Option<ExecutionOutcome>,
    pub error: Option<AppError>,
}

impl DeviceRunReport {
    pub fn from_result(serial: String, result: Result<ExecutionOutcome, AppError>) -> Self {
        match result {
            Ok(outcome) => Self {
                serial,
                outcome: Some(outcome),
                error: None,
            },
            Err(error) => Self {
                serial,
                outcome: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}
