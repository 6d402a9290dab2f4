use std::process::ExitCode;

use adb_runner_lib::app::commands::{
    add_catalog_entry_with, check_adb_with, check_scrcpy_with, list_catalog_with,
    list_devices_with, refresh_catalog_with, remove_catalog_entry_with, run_entry_on_all_with,
    run_entry_with,
};
use adb_runner_lib::app::config::{config_path, load_config, save_config};
use adb_runner_lib::app::error::AppError;
use adb_runner_lib::app::logging::init_logging;
use adb_runner_lib::app::models::{
    CommandEntry, CommandKind, CommandResponse, Device, DeviceRunReport, ExecutionOutcome, ToolInfo,
};
use adb_runner_lib::app::state::AppState;
use serde::Serialize;
use uuid::Uuid;

const USAGE: &str = "Usage: adb_runner [--json] <command>

Commands:
  devices                                 List attached devices
  list <adb|scrcpy>                       Show catalog entries
  refresh <adb|scrcpy>                    Re-read a catalog from disk
  add <adb|scrcpy> <title> <template...>  Append a catalog entry
  remove <adb|scrcpy> <title> <template...>
                                          Delete a catalog entry
  run <adb|scrcpy> <title> [--serial S]   Run an entry on one device
  run-all <adb|scrcpy> <title>            Run an entry on every ready device
  check                                   Report adb and scrcpy availability
  config [save]                           Show the effective config, or write it out

The target device for `run` falls back to ANDROID_SERIAL.
";

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Devices,
    List(CommandKind),
    Refresh(CommandKind),
    Add {
        kind: CommandKind,
        title: String,
        template: String,
    },
    Remove {
        kind: CommandKind,
        title: String,
        template: String,
    },
    Run {
        kind: CommandKind,
        title: String,
        serial: Option<String>,
    },
    RunAll {
        kind: CommandKind,
        title: String,
    },
    Check,
    Config {
        save: bool,
    },
}

#[derive(Debug, Clone)]
struct Args {
    json: bool,
    action: Action,
}

#[derive(Serialize)]
struct ToolReport {
    adb: ToolInfo,
    scrcpy: ToolInfo,
}

fn parse_kind(value: Option<String>) -> Result<CommandKind, String> {
    let value = value.ok_or_else(|| "missing command kind (adb|scrcpy)".to_string())?;
    value.parse::<CommandKind>()
}

fn parse_args(raw: Vec<String>) -> Result<Args, String> {
    let mut json = false;
    let mut serial = std::env::var("ANDROID_SERIAL")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let mut positional: Vec<String> = Vec::new();

    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--json" => {
                json = true;
            }
            "--serial" => {
                serial = it
                    .next()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                if serial.is_none() {
                    return Err("--serial requires a value".to_string());
                }
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = positional.next().ok_or_else(|| USAGE.to_string())?;
    let action = match command.as_str() {
        "devices" => Action::Devices,
        "check" => Action::Check,
        "config" => match positional.next().as_deref() {
            None => Action::Config { save: false },
            Some("save") => Action::Config { save: true },
            Some(other) => return Err(format!("Unknown config action: {other}")),
        },
        "list" => Action::List(parse_kind(positional.next())?),
        "refresh" => Action::Refresh(parse_kind(positional.next())?),
        "add" | "remove" => {
            let kind = parse_kind(positional.next())?;
            let title = positional
                .next()
                .ok_or_else(|| format!("{command} requires a title"))?;
            let template = positional.collect::<Vec<_>>().join(" ");
            if command == "add" {
                Action::Add { kind, title, template }
            } else {
                Action::Remove { kind, title, template }
            }
        }
        "run" => Action::Run {
            kind: parse_kind(positional.next())?,
            title: positional
                .next()
                .ok_or_else(|| "run requires a title".to_string())?,
            serial,
        },
        "run-all" => Action::RunAll {
            kind: parse_kind(positional.next())?,
            title: positional
                .next()
                .ok_or_else(|| "run-all requires a title".to_string())?,
        },
        other => return Err(format!("Unknown command: {other}\n\n{USAGE}")),
    };

    Ok(Args { json, action })
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("Failed to encode output: {err}"),
    }
}

fn print_entries(kind: CommandKind, entries: &[CommandEntry]) {
    if entries.is_empty() {
        println!("No {kind} commands.");
        return;
    }
    for entry in entries {
        println!("{}\t{}", entry.title, entry.template);
    }
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices attached.");
        return;
    }
    for device in devices {
        println!(
            "{}\t{}\t{}\tAndroid {}",
            device.serial,
            device.state.as_str(),
            device.model.as_deref().unwrap_or("-"),
            device.android_version.as_deref().unwrap_or("-"),
        );
    }
}

fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Captured(result) => {
            if !result.combined_output.is_empty() {
                println!("{}", result.combined_output);
            }
            eprintln!(
                "[{}] exit {} in {}ms",
                result.serial,
                result
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                result.duration_ms
            );
        }
        ExecutionOutcome::Detached(handle) => {
            println!("[{}] launched {} (pid {})", handle.serial, handle.program, handle.pid);
        }
    }
}

fn print_reports(reports: &[DeviceRunReport]) {
    if reports.is_empty() {
        println!("No ready devices.");
    }
    for report in reports {
        match (&report.outcome, &report.error) {
            (Some(outcome), _) => print_outcome(outcome),
            (None, Some(err)) => eprintln!("[{}] {err}", report.serial),
            (None, None) => {}
        }
    }
}

fn print_tool(name: &str, info: &ToolInfo) {
    if info.available {
        let first_line = info.version_output.lines().next().unwrap_or("");
        println!("{name}: ok ({}) {first_line}", info.command_path);
    } else {
        println!(
            "{name}: unavailable ({})",
            info.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn emit<T: Serialize>(json: bool, response: &CommandResponse<T>, human: impl FnOnce(&T)) {
    if json {
        print_json(response);
    } else {
        human(&response.data);
    }
}

fn execute(args: Args, trace_id: String) -> Result<(), AppError> {
    let config = load_config(&trace_id)?;
    init_logging(&config.logging.log_level);
    let json = args.json;

    match args.action {
        Action::Devices => {
            let state = AppState::new();
            let response = list_devices_with(&config, &state, trace_id)?;
            emit(json, &response, |devices| print_devices(devices));
        }
        Action::List(kind) => {
            let response = list_catalog_with(&config, kind, trace_id)?;
            emit(json, &response, |entries| print_entries(kind, entries));
        }
        Action::Refresh(kind) => {
            let response = refresh_catalog_with(&config, kind, trace_id)?;
            emit(json, &response, |entries| print_entries(kind, entries));
        }
        Action::Add { kind, title, template } => {
            let response = add_catalog_entry_with(&config, kind, title, template, trace_id)?;
            emit(json, &response, |entries| print_entries(kind, entries));
        }
        Action::Remove { kind, title, template } => {
            let response = remove_catalog_entry_with(&config, kind, title, template, trace_id)?;
            emit(json, &response, |entries| print_entries(kind, entries));
        }
        Action::Run { kind, title, serial } => {
            let state = AppState::new();
            let response = run_entry_with(&config, &state, kind, title, serial, trace_id)?;
            emit(json, &response, print_outcome);
        }
        Action::RunAll { kind, title } => {
            let response = run_entry_on_all_with(&config, kind, title, trace_id)?;
            emit(json, &response, |reports| print_reports(reports));
        }
        Action::Check => {
            let adb = check_adb_with(&config, trace_id.clone()).data;
            let scrcpy = check_scrcpy_with(&config, trace_id.clone()).data;
            let response = CommandResponse {
                trace_id,
                data: ToolReport { adb, scrcpy },
            };
            emit(json, &response, |report| {
                print_tool("adb", &report.adb);
                print_tool("scrcpy", &report.scrcpy);
            });
        }
        Action::Config { save } => {
            if save {
                save_config(&config, &trace_id)?;
                if !json {
                    println!("Wrote {}", config_path().display());
                }
            }
            let response = CommandResponse {
                trace_id,
                data: config,
            };
            emit(json, &response, |config| {
                if !save {
                    print_json(config);
                }
            });
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };
    let json = args.json;
    let trace_id = Uuid::new_v4().to_string();

    match execute(args, trace_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                print_json(&err);
            } else {
                eprintln!("error: {err} [trace_id={}]", err.trace_id);
            }
            ExitCode::from(1)
        }
    }
}
