use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::app::adb::locator::{expand_home, locate_tool, normalize_command_path, DEFAULT_SCRCPY_PROGRAM};
use crate::app::adb::runner::run_command;
use crate::app::config::ScrcpySettings;
use crate::app::error::AppError;

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ScrcpyAvailability {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    /// Why the tool is unusable; `None` when available.
    pub error: Option<String>,
}

fn common_install_paths() -> Vec<&'static str> {
    if std::env::consts::OS == "macos" {
        vec![
            "/opt/homebrew/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "~/Applications/scrcpy.app/Contents/MacOS/scrcpy",
        ]
    } else {
        vec![
            "/usr/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "/snap/bin/scrcpy",
            "~/.local/bin/scrcpy",
            "/opt/scrcpy/scrcpy",
        ]
    }
}

/// Finds the scrcpy binary: the configured path if set, otherwise `PATH`,
/// then the usual install locations.
pub fn resolve_scrcpy_program(settings: &ScrcpySettings, trace_id: &str) -> Result<PathBuf, AppError> {
    let configured = normalize_command_path(&settings.command_path);
    if !configured.is_empty() {
        return locate_tool(&configured, trace_id);
    }
    if let Ok(path) = locate_tool(DEFAULT_SCRCPY_PROGRAM, trace_id) {
        return Ok(path);
    }
    common_install_paths()
        .into_iter()
        .map(expand_home)
        .find(|path| path.is_file())
        .ok_or_else(|| {
            AppError::tool_unavailable(
                "scrcpy is not installed or not on PATH; set scrcpy.command_path",
                trace_id,
            )
        })
}

pub fn check_scrcpy_availability(settings: &ScrcpySettings, trace_id: &str) -> ScrcpyAvailability {
    let mut result = ScrcpyAvailability {
        available: false,
        version_output: String::new(),
        command_path: DEFAULT_SCRCPY_PROGRAM.to_string(),
        error: None,
    };
    let path = match resolve_scrcpy_program(settings, trace_id) {
        Ok(path) => path,
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "scrcpy not resolvable");
            result.error = Some(err.error);
            return result;
        }
    };
    result.command_path = path.to_string_lossy().to_string();

    let args = vec!["--version".to_string()];
    match run_command(&result.command_path, &args, Some(VERSION_TIMEOUT), trace_id) {
        Ok(output) if output.success() => {
            result.available = true;
            result.version_output = output.combined();
        }
        Ok(output) => {
            result.version_output = output.combined();
            result.error = Some(exit_failure_reason(
                "scrcpy --version",
                output.exit_code,
                &result.version_output,
            ));
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "scrcpy check failed");
            result.error = Some(err.error);
        }
    }
    result
}

/// Message for a version probe that ran but exited non-zero.
pub fn exit_failure_reason(probe: &str, exit_code: Option<i32>, output: &str) -> String {
    let status = exit_code
        .map(|code| format!("exit code {code}"))
        .unwrap_or_else(|| "a signal".to_string());
    if output.is_empty() {
        format!("{probe} failed with {status}")
    } else {
        format!("{probe} failed with {status}: {output}")
    }
}

/// Arguments after the program: the target serial, configured default flags,
/// then the entry's own tokens.
pub fn build_scrcpy_args(serial: &str, settings: &ScrcpySettings, template_tokens: &[String]) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string()];
    if !settings.extra_args.trim().is_empty() {
        args.extend(settings.extra_args.split_whitespace().map(|s| s.to_string()));
    }
    args.extend(template_tokens.iter().cloned());
    args
}
