use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::devices::DeviceRegistry;
use crate::app::adb::locator::{locate_tool, resolve_adb_program};
use crate::app::adb::runner::run_command;
use crate::app::adb::scrcpy::{check_scrcpy_availability, exit_failure_reason};
use crate::app::catalog::CatalogStore;
use crate::app::config::{load_config, AppConfig};
use crate::app::error::AppError;
use crate::app::executor::CommandExecutor;
use crate::app::models::{
    CommandEntry, CommandKind, CommandResponse, Device, DeviceRunReport, DeviceTarget,
    ExecutionOutcome, ToolInfo,
};
use crate::app::state::AppState;
use crate::app::worker::ExecutionWorker;

#[cfg(test)]
mod tests;

pub fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required"), trace_id));
    }
    Ok(())
}

fn respond<T>(trace_id: String, data: T) -> CommandResponse<T> {
    CommandResponse { trace_id, data }
}

fn catalog_store(config: &AppConfig) -> CatalogStore {
    CatalogStore::new(config.catalog_dir())
}

fn device_registry(config: &AppConfig) -> DeviceRegistry {
    DeviceRegistry::new(resolve_adb_program(&config.adb.command_path))
}

/// The device an action should hit: an explicit serial, else the current selection.
fn resolve_target(
    state: &AppState,
    serial: Option<String>,
    trace_id: &str,
) -> Result<DeviceTarget, AppError> {
    if let Some(serial) = serial.filter(|value| !value.trim().is_empty()) {
        return Ok(DeviceTarget::new(serial.trim()));
    }
    state
        .target()
        .ok_or_else(|| AppError::validation("No device selected", trace_id))
}

// Catalog

pub fn list_catalog(
    kind: CommandKind,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    list_catalog_with(&config, kind, trace_id)
}

pub fn list_catalog_with(
    config: &AppConfig,
    kind: CommandKind,
    trace_id: String,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let entries = catalog_store(config).load(kind, &trace_id)?;
    Ok(respond(trace_id, entries))
}

pub fn refresh_catalog(
    kind: CommandKind,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    refresh_catalog_with(&config, kind, trace_id)
}

pub fn refresh_catalog_with(
    config: &AppConfig,
    kind: CommandKind,
    trace_id: String,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    info!(trace_id = %trace_id, kind = %kind, "refresh_catalog");
    let entries = catalog_store(config).refresh(kind, &trace_id)?;
    Ok(respond(trace_id, entries))
}

pub fn add_catalog_entry(
    kind: CommandKind,
    title: String,
    template: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    add_catalog_entry_with(&config, kind, title, template, trace_id)
}

pub fn add_catalog_entry_with(
    config: &AppConfig,
    kind: CommandKind,
    title: String,
    template: String,
    trace_id: String,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    ensure_non_empty(&title, "title", &trace_id)?;
    let entry = CommandEntry::new(kind, title, template);
    let entries = catalog_store(config).append(kind, &entry, &trace_id)?;
    Ok(respond(trace_id, entries))
}

pub fn remove_catalog_entry(
    kind: CommandKind,
    title: String,
    template: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    remove_catalog_entry_with(&config, kind, title, template, trace_id)
}

pub fn remove_catalog_entry_with(
    config: &AppConfig,
    kind: CommandKind,
    title: String,
    template: String,
    trace_id: String,
) -> Result<CommandResponse<Vec<CommandEntry>>, AppError> {
    let entry = CommandEntry::new(kind, title, template);
    let entries = catalog_store(config).remove(kind, &entry, &trace_id)?;
    Ok(respond(trace_id, entries))
}

// Devices

pub fn list_devices(
    state: &AppState,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<Device>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    list_devices_with(&config, state, trace_id)
}

pub fn list_devices_with(
    config: &AppConfig,
    state: &AppState,
    trace_id: String,
) -> Result<CommandResponse<Vec<Device>>, AppError> {
    info!(trace_id = %trace_id, "list_devices");
    let devices = device_registry(config).list_devices(&trace_id)?;
    if state.reconcile(&devices) {
        info!(trace_id = %trace_id, "selected device disconnected; selection cleared");
    }
    Ok(respond(trace_id, devices))
}

pub fn select_device(
    state: &AppState,
    serial: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<DeviceTarget>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    state.select(serial);
    let target = state
        .target()
        .ok_or_else(|| AppError::system("Selection was not stored", &trace_id))?;
    Ok(respond(trace_id, target))
}

// Execution

pub fn run_entry(
    state: &AppState,
    kind: CommandKind,
    title: String,
    serial: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ExecutionOutcome>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    run_entry_with(&config, state, kind, title, serial, trace_id)
}

pub fn run_entry_with(
    config: &AppConfig,
    state: &AppState,
    kind: CommandKind,
    title: String,
    serial: Option<String>,
    trace_id: String,
) -> Result<CommandResponse<ExecutionOutcome>, AppError> {
    ensure_non_empty(&title, "title", &trace_id)?;
    let target = resolve_target(state, serial, &trace_id)?;
    let entry = catalog_store(config).find_by_title(kind, &title, &trace_id)?;
    let outcome = CommandExecutor::from_config(config).run(&target, &entry, &trace_id)?;
    Ok(respond(trace_id, outcome))
}

/// Runs one catalog entry on every ready device.
pub fn run_entry_on_all(
    kind: CommandKind,
    title: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<DeviceRunReport>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    run_entry_on_all_with(&config, kind, title, trace_id)
}

pub fn run_entry_on_all_with(
    config: &AppConfig,
    kind: CommandKind,
    title: String,
    trace_id: String,
) -> Result<CommandResponse<Vec<DeviceRunReport>>, AppError> {
    ensure_non_empty(&title, "title", &trace_id)?;
    let entry = catalog_store(config).find_by_title(kind, &title, &trace_id)?;
    let devices = device_registry(config).list_devices(&trace_id)?;
    if !devices.iter().any(|device| device.state.is_ready()) {
        warn!(trace_id = %trace_id, "no ready devices attached");
    }
    let reports = CommandExecutor::from_config(config).run_on_devices(&devices, &entry, &trace_id);
    Ok(respond(trace_id, reports))
}

/// Queues `title` on the worker and returns the job id at once.
pub fn submit_entry_with(
    config: &AppConfig,
    worker: &ExecutionWorker,
    state: &AppState,
    kind: CommandKind,
    title: String,
    serial: Option<String>,
    trace_id: String,
) -> Result<CommandResponse<String>, AppError> {
    ensure_non_empty(&title, "title", &trace_id)?;
    let target = resolve_target(state, serial, &trace_id)?;
    let entry = catalog_store(config).find_by_title(kind, &title, &trace_id)?;
    let job_id = worker.submit(target, entry, trace_id.clone());
    Ok(respond(trace_id, job_id))
}

// Tool checks

pub fn check_adb(trace_id: Option<String>) -> Result<CommandResponse<ToolInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    Ok(check_adb_with(&config, trace_id))
}

pub fn check_adb_with(config: &AppConfig, trace_id: String) -> CommandResponse<ToolInfo> {
    info!(trace_id = %trace_id, "check_adb");
    let program = resolve_adb_program(&config.adb.command_path);
    let path = match locate_tool(&program, &trace_id) {
        Ok(path) => path.to_string_lossy().to_string(),
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "adb not resolvable");
            return respond(
                trace_id,
                ToolInfo {
                    available: false,
                    version_output: String::new(),
                    command_path: program,
                    error: Some(err.error),
                },
            );
        }
    };

    let args = vec!["version".to_string()];
    let info = match run_command(&path, &args, Some(Duration::from_secs(5)), &trace_id) {
        Ok(output) => {
            let version_output = output.combined();
            let error = if output.success() {
                None
            } else {
                Some(exit_failure_reason("adb version", output.exit_code, &version_output))
            };
            ToolInfo {
                available: output.success(),
                version_output,
                command_path: path,
                error,
            }
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "adb check failed");
            ToolInfo {
                available: false,
                version_output: String::new(),
                command_path: path,
                error: Some(err.error),
            }
        }
    };
    respond(trace_id, info)
}

pub fn check_scrcpy(trace_id: Option<String>) -> Result<CommandResponse<ToolInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    Ok(check_scrcpy_with(&config, trace_id))
}

pub fn check_scrcpy_with(config: &AppConfig, trace_id: String) -> CommandResponse<ToolInfo> {
    info!(trace_id = %trace_id, "check_scrcpy");
    let availability = check_scrcpy_availability(&config.scrcpy, &trace_id);
    respond(
        trace_id,
        ToolInfo {
            available: availability.available,
            version_output: availability.version_output,
            command_path: availability.command_path,
            error: availability.error,
        },
    )
}
