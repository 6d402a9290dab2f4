use std::path::{Path, PathBuf};

use crate::app::error::AppError;

pub const DEFAULT_ADB_PROGRAM: &str = "adb";
pub const DEFAULT_SCRCPY_PROGRAM: &str = "scrcpy";

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

pub fn resolve_adb_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        DEFAULT_ADB_PROGRAM.to_string()
    } else {
        normalized
    }
}

/// Resolves `program` to an executable path before anything is spawned.
///
/// Bare names are looked up on `PATH`; anything containing a path separator
/// must exist as a file.
pub fn locate_tool(program: &str, trace_id: &str) -> Result<PathBuf, AppError> {
    let program = normalize_command_path(program);
    if program.is_empty() {
        return Err(AppError::tool_unavailable("Tool command is empty", trace_id));
    }
    if is_bare_name(&program) {
        return which::which(&program).map_err(|err| {
            AppError::tool_unavailable(format!("{program} was not found on PATH: {err}"), trace_id)
        });
    }
    let path = expand_home(&program);
    if path.is_dir() {
        return Err(AppError::tool_unavailable(
            format!("{} is a directory, not an executable", path.display()),
            trace_id,
        ));
    }
    if !path.exists() {
        return Err(AppError::tool_unavailable(
            format!("Executable not found at {}", path.display()),
            trace_id,
        ));
    }
    Ok(path)
}

fn is_bare_name(program: &str) -> bool {
    !program.contains('/') && !program.contains('\\') && !program.starts_with('~')
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
