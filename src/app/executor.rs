use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::adb::locator::{locate_tool, resolve_adb_program};
use crate::app::adb::runner::run_command;
use crate::app::adb::scrcpy::{build_scrcpy_args, resolve_scrcpy_program};
use crate::app::config::{AppConfig, ScrcpySettings};
use crate::app::error::AppError;
use crate::app::models::{
    CommandEntry, CommandKind, Device, DeviceRunReport, DeviceTarget, ExecutionOutcome,
    ExecutionResult, ExitStatus, ProcessHandle,
};

/// Runs catalog entries against a device. Templates are split on whitespace and
/// passed to the tool as argv; no shell ever sees them.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    adb_program: String,
    scrcpy: ScrcpySettings,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new(adb_program: impl Into<String>, scrcpy: ScrcpySettings) -> Self {
        Self {
            adb_program: adb_program.into(),
            scrcpy,
            timeout: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(resolve_adb_program(&config.adb.command_path), config.scrcpy.clone())
            .with_timeout(config.command_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs an ADB entry to completion. A non-zero exit is reported in the
    /// result, not as an error.
    pub fn run_captured(
        &self,
        target: &DeviceTarget,
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Result<ExecutionResult, AppError> {
        ensure_kind(entry, CommandKind::Adb, trace_id)?;
        ensure_serial(target, trace_id)?;
        let program = locate_tool(&self.adb_program, trace_id)?;
        let program = program.to_string_lossy().to_string();
        let args = build_adb_args(&target.serial, entry);

        info!(
            trace_id = %trace_id,
            serial = %target.serial,
            title = %entry.title,
            "running adb command"
        );
        let output = run_command(&program, &args, self.timeout, trace_id)?;
        let exit_status = ExitStatus::from_code(output.exit_code);
        if exit_status == ExitStatus::Failure {
            warn!(
                trace_id = %trace_id,
                serial = %target.serial,
                exit_code = ?output.exit_code,
                "adb command exited with failure"
            );
        }
        Ok(ExecutionResult {
            serial: target.serial.clone(),
            exit_status,
            exit_code: output.exit_code,
            combined_output: output.combined(),
            duration_ms: output.duration.as_millis() as u64,
        })
    }

    /// Starts a scrcpy window and returns at once. The child is neither
    /// watched nor killed; a background thread only reaps it on exit.
    pub fn run_detached(
        &self,
        target: &DeviceTarget,
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Result<ProcessHandle, AppError> {
        ensure_kind(entry, CommandKind::Scrcpy, trace_id)?;
        ensure_serial(target, trace_id)?;
        let program = resolve_scrcpy_program(&self.scrcpy, trace_id)?;
        let program = program.to_string_lossy().to_string();
        let args = build_scrcpy_args(&target.serial, &self.scrcpy, &entry.template_tokens());

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                AppError::process_launch(format!("Failed to start {program}: {err}"), trace_id)
            })?;
        let pid = child.id();
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        info!(
            trace_id = %trace_id,
            serial = %target.serial,
            title = %entry.title,
            pid,
            "scrcpy launched"
        );
        Ok(ProcessHandle {
            serial: target.serial.clone(),
            pid,
            program,
            started_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn run(
        &self,
        target: &DeviceTarget,
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Result<ExecutionOutcome, AppError> {
        match entry.kind {
            CommandKind::Adb => self
                .run_captured(target, entry, trace_id)
                .map(ExecutionOutcome::Captured),
            CommandKind::Scrcpy => self
                .run_detached(target, entry, trace_id)
                .map(ExecutionOutcome::Detached),
        }
    }

    /// Runs `entry` on every ready device concurrently. Devices that are not
    /// ready are skipped; one device failing does not stop the others.
    pub fn run_on_devices(
        &self,
        devices: &[Device],
        entry: &CommandEntry,
        trace_id: &str,
    ) -> Vec<DeviceRunReport> {
        let targets: Vec<DeviceTarget> = devices
            .iter()
            .filter(|device| {
                let ready = device.state.is_ready();
                if !ready {
                    debug!(
                        trace_id = %trace_id,
                        serial = %device.serial,
                        state = device.state.as_str(),
                        "skipping device that is not ready"
                    );
                }
                ready
            })
            .map(Device::target)
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .iter()
                .map(|target| scope.spawn(move || self.run(target, entry, trace_id)))
                .collect();
            handles
                .into_iter()
                .zip(targets.iter())
                .map(|(handle, target)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(AppError::system("Execution thread panicked", trace_id))
                    });
                    DeviceRunReport::from_result(target.serial.clone(), result)
                })
                .collect()
        })
    }
}

pub fn build_adb_args(serial: &str, entry: &CommandEntry) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string()];
    args.extend(entry.template_tokens());
    args
}

fn ensure_kind(entry: &CommandEntry, expected: CommandKind, trace_id: &str) -> Result<(), AppError> {
    if entry.kind != expected {
        return Err(AppError::validation(
            format!("\"{}\" is a {} command, expected {expected}", entry.title, entry.kind),
            trace_id,
        ));
    }
    Ok(())
}

fn ensure_serial(target: &DeviceTarget, trace_id: &str) -> Result<(), AppError> {
    if target.serial.trim().is_empty() {
        return Err(AppError::validation("serial is required", trace_id));
    }
    Ok(())
}
