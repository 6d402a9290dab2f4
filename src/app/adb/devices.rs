use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::adb::locator::locate_tool;
use crate::app::adb::parse::{build_device, parse_adb_devices, parse_getprop_map};
use crate::app::adb::runner::run_command;
use crate::app::error::AppError;
use crate::app::models::{Device, DeviceSummary};

const PROPERTY_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Enumerates attached devices through the adb binary. Holds no cache: every
/// call re-runs `adb devices`.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    adb_program: String,
}

impl DeviceRegistry {
    pub fn new(adb_program: impl Into<String>) -> Self {
        Self {
            adb_program: adb_program.into(),
        }
    }

    pub fn list_devices(&self, trace_id: &str) -> Result<Vec<Device>, AppError> {
        let started = Instant::now();
        let program = locate_tool(&self.adb_program, trace_id)?;
        let program = program.to_string_lossy().to_string();

        let args = vec!["devices".to_string(), "-l".to_string()];
        let output = run_command(&program, &args, None, trace_id).map_err(|err| {
            AppError::tool_unavailable(format!("adb could not be invoked: {}", err.error), trace_id)
        })?;
        if !output.success() {
            return Err(AppError::tool_unavailable(
                format!("adb devices failed: {}", output.combined()),
                trace_id,
            ));
        }

        let summaries = parse_adb_devices(&output.stdout);
        let devices = std::thread::scope(|scope| {
            let handles: Vec<_> = summaries
                .iter()
                .map(|summary| {
                    let program = program.as_str();
                    scope.spawn(move || resolve_device(program, summary, trace_id))
                })
                .collect();
            handles
                .into_iter()
                .zip(summaries.iter())
                .map(|(handle, summary)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| build_device(summary, None))
                })
                .collect::<Vec<_>>()
        });

        info!(
            trace_id = %trace_id,
            count = devices.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "devices listed"
        );
        Ok(devices)
    }
}

fn resolve_device(program: &str, summary: &DeviceSummary, trace_id: &str) -> Device {
    if !summary.state.is_ready() {
        return build_device(summary, None);
    }
    let args = vec![
        "-s".to_string(),
        summary.serial.clone(),
        "shell".to_string(),
        "getprop".to_string(),
    ];
    match run_command(program, &args, Some(PROPERTY_QUERY_TIMEOUT), trace_id) {
        Ok(output) if output.success() => {
            let props = parse_getprop_map(&output.stdout);
            build_device(summary, Some(&props))
        }
        Ok(output) => {
            warn!(
                trace_id = %trace_id,
                serial = %summary.serial,
                exit_code = ?output.exit_code,
                "getprop failed; device properties unavailable"
            );
            build_device(summary, None)
        }
        Err(err) => {
            warn!(
                trace_id = %trace_id,
                serial = %summary.serial,
                error = %err,
                "getprop could not run; device properties unavailable"
            );
            build_device(summary, None)
        }
    }
}
