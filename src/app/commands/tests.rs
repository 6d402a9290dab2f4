use super::*;

use std::fs;

use tempfile::TempDir;

use crate::app::config::{save_config_to_path, CONFIG_PATH_ENV};
use crate::app::models::ExitStatus;

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.catalog.directory = dir.path().join("catalog").to_string_lossy().to_string();
    config.adb.command_path = dir.path().join("missing-adb").to_string_lossy().to_string();
    config.scrcpy.command_path = dir.path().join("missing-scrcpy").to_string_lossy().to_string();
    config
}

#[test]
fn resolve_trace_id_keeps_caller_value() {
    assert_eq!(resolve_trace_id(Some("abc".to_string())), "abc");
    let generated = resolve_trace_id(Some("  ".to_string()));
    assert!(Uuid::parse_str(&generated).is_ok());
    assert!(Uuid::parse_str(&resolve_trace_id(None)).is_ok());
}

#[test]
fn catalog_add_list_remove() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);

    let listed = list_catalog_with(&config, CommandKind::Adb, "t1".to_string()).expect("list");
    assert_eq!(listed.trace_id, "t1");
    assert!(listed.data.is_empty());

    let added = add_catalog_entry_with(
        &config,
        CommandKind::Adb,
        "Reboot".to_string(),
        "reboot".to_string(),
        "t2".to_string(),
    )
    .expect("add");
    assert_eq!(added.data, vec![CommandEntry::new(CommandKind::Adb, "Reboot", "reboot")]);

    let raw = fs::read_to_string(dir.path().join("catalog").join("adb_commands.txt")).expect("raw");
    assert_eq!(raw, "TITLE: Reboot; ADB_COMMAND: reboot\n");

    let removed = remove_catalog_entry_with(
        &config,
        CommandKind::Adb,
        "Reboot".to_string(),
        "reboot".to_string(),
        "t3".to_string(),
    )
    .expect("remove");
    assert!(removed.data.is_empty());

    let err = remove_catalog_entry_with(
        &config,
        CommandKind::Adb,
        "Reboot".to_string(),
        "reboot".to_string(),
        "t4".to_string(),
    )
    .unwrap_err();
    assert_eq!(err.code, "ERR_NOT_FOUND");
    assert_eq!(err.trace_id, "t4");
}

#[test]
fn refresh_uses_the_given_config() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    fs::create_dir_all(dir.path().join("catalog")).expect("catalog dir");
    fs::write(
        dir.path().join("catalog").join("adb_commands.txt"),
        "TITLE: Root; ADB_COMMAND: root\n",
    )
    .expect("seed");

    let refreshed = refresh_catalog_with(&config, CommandKind::Adb, "r".to_string()).expect("refresh");
    assert_eq!(refreshed.trace_id, "r");
    assert_eq!(refreshed.data, vec![CommandEntry::new(CommandKind::Adb, "Root", "root")]);
}

#[test]
fn add_rejects_blank_title() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    let err = add_catalog_entry_with(
        &config,
        CommandKind::Scrcpy,
        "  ".to_string(),
        "--turn-screen-off".to_string(),
        "t".to_string(),
    )
    .unwrap_err();
    assert_eq!(err.code, "ERR_VALIDATION");
    assert!(!dir.path().join("catalog").exists());
}

#[test]
fn run_entry_requires_a_device() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    let state = AppState::new();
    let err = run_entry_with(
        &config,
        &state,
        CommandKind::Adb,
        "Reboot".to_string(),
        None,
        "t".to_string(),
    )
    .unwrap_err();
    assert_eq!(err.code, "ERR_VALIDATION");
}

#[test]
fn run_entry_unknown_title_is_not_found() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    let state = AppState::new();
    state.select("R58M");
    let err = run_entry_with(
        &config,
        &state,
        CommandKind::Adb,
        "Nope".to_string(),
        None,
        "t".to_string(),
    )
    .unwrap_err();
    assert_eq!(err.code, "ERR_NOT_FOUND");
}

#[test]
fn run_entry_without_adb_is_tool_unavailable() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    add_catalog_entry_with(
        &config,
        CommandKind::Adb,
        "Reboot".to_string(),
        "reboot".to_string(),
        "t".to_string(),
    )
    .expect("add");
    let state = AppState::new();
    let err = run_entry_with(
        &config,
        &state,
        CommandKind::Adb,
        "Reboot".to_string(),
        Some("R58M".to_string()),
        "t".to_string(),
    )
    .unwrap_err();
    assert_eq!(err.code, "ERR_TOOL_UNAVAILABLE");
}

#[test]
fn select_device_rejects_blank_serial() {
    let state = AppState::new();
    let err = select_device(&state, " ".to_string(), Some("t".to_string())).unwrap_err();
    assert_eq!(err.code, "ERR_VALIDATION");

    let selected = select_device(&state, " R58M ".to_string(), Some("t".to_string())).expect("select");
    assert_eq!(selected.data, DeviceTarget::new("R58M"));
}

#[test]
fn check_tools_report_missing_binaries() {
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);

    let adb = check_adb_with(&config, "t".to_string());
    assert!(!adb.data.available);
    assert!(adb.data.error.is_some());

    let scrcpy = check_scrcpy_with(&config, "t".to_string());
    assert_eq!(scrcpy.trace_id, "t");
    assert!(!scrcpy.data.available);
    let reason = scrcpy.data.error.expect("scrcpy reason");
    assert!(reason.contains("missing-scrcpy"), "{reason}");
}

#[test]
fn list_catalog_reads_config_from_env_path() {
    let _guard = env_lock();
    let dir = TempDir::new().expect("tmp");
    let config = config_in(&dir);
    let config_file = dir.path().join("config.json");
    save_config_to_path(&config, &config_file, &dir.path().join("config.backup.json"), "t")
        .expect("save");
    fs::create_dir_all(dir.path().join("catalog")).expect("catalog dir");
    fs::write(
        dir.path().join("catalog").join("scrcpy_commands.txt"),
        "TITLE: Mirror; SCRCPY_COMMAND: --stay-awake\nnot an entry\n",
    )
    .expect("seed");

    std::env::set_var(CONFIG_PATH_ENV, &config_file);
    let result = list_catalog(CommandKind::Scrcpy, Some("env".to_string()));
    std::env::remove_var(CONFIG_PATH_ENV);

    let response = result.expect("list");
    assert_eq!(response.trace_id, "env");
    assert_eq!(
        response.data,
        vec![CommandEntry::new(CommandKind::Scrcpy, "Mirror", "--stay-awake")]
    );
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use crate::app::test_support::write_script;
    use crate::app::worker::channel_emitter;
    use std::sync::Arc;

    const FAKE_ADB: &str = r#"#!/bin/sh
if [ "$1" = "version" ]; then
  echo "Android Debug Bridge version 1.0.41"
  exit 0
fi
if [ "$1" = "devices" ]; then
  echo "List of devices attached"
  echo "A1 device transport_id:1"
  echo "B2 device transport_id:2"
  echo "C3 offline transport_id:3"
  exit 0
fi
if [ "$1" = "-s" ] && [ "$3" = "shell" ] && [ "$4" = "getprop" ]; then
  echo "[ro.build.version.release]: [14]"
  exit 0
fi
if [ "$1" = "-s" ]; then
  echo "ran on $2: $3 $4"
  exit 0
fi
exit 2
"#;

    fn config_with_adb(dir: &TempDir) -> AppConfig {
        let mut config = config_in(dir);
        let adb = write_script(dir.path(), "adb", FAKE_ADB);
        config.adb.command_path = adb.to_string_lossy().to_string();
        add_catalog_entry_with(
            &config,
            CommandKind::Adb,
            "Home".to_string(),
            "shell input".to_string(),
            "seed".to_string(),
        )
        .expect("seed");
        config
    }

    #[test]
    fn check_adb_reports_version() {
        let dir = TempDir::new().expect("tmp");
        let config = config_with_adb(&dir);
        let info = check_adb_with(&config, "t".to_string()).data;
        assert!(info.available);
        assert!(info.version_output.contains("1.0.41"));
        assert_eq!(info.error, None);
    }

    #[test]
    fn check_adb_reports_failing_version_probe() {
        let dir = TempDir::new().expect("tmp");
        let mut config = config_in(&dir);
        let adb = write_script(
            dir.path(),
            "adb",
            "#!/bin/sh\necho 'adb: cannot execute binary file' >&2\nexit 126\n",
        );
        config.adb.command_path = adb.to_string_lossy().to_string();

        let info = check_adb_with(&config, "t".to_string()).data;
        assert!(!info.available);
        let reason = info.error.expect("reason");
        assert!(reason.contains("exit code 126"), "{reason}");
        assert!(reason.contains("cannot execute binary file"), "{reason}");
    }

    #[test]
    fn check_scrcpy_passes_probe_failure_through() {
        let dir = TempDir::new().expect("tmp");
        let mut config = config_in(&dir);
        let scrcpy = write_script(dir.path(), "scrcpy", "#!/bin/sh\necho 'no display' >&2\nexit 1\n");
        config.scrcpy.command_path = scrcpy.to_string_lossy().to_string();

        let info = check_scrcpy_with(&config, "t".to_string()).data;
        assert!(!info.available);
        assert_eq!(
            info.error.as_deref(),
            Some("scrcpy --version failed with exit code 1: no display")
        );
    }

    #[test]
    fn list_devices_clears_vanished_selection() {
        let dir = TempDir::new().expect("tmp");
        let config = config_with_adb(&dir);
        let state = AppState::new();
        state.select("Z9");

        let devices = list_devices_with(&config, &state, "t".to_string()).expect("devices");
        assert_eq!(devices.data.len(), 3);
        assert_eq!(devices.data[0].android_version.as_deref(), Some("14"));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn run_entry_uses_selection() {
        let dir = TempDir::new().expect("tmp");
        let config = config_with_adb(&dir);
        let state = AppState::new();
        state.select("B2");

        let outcome = run_entry_with(
            &config,
            &state,
            CommandKind::Adb,
            "Home".to_string(),
            None,
            "t".to_string(),
        )
        .expect("run")
        .data;
        match outcome {
            ExecutionOutcome::Captured(result) => {
                assert_eq!(result.serial, "B2");
                assert_eq!(result.exit_status, ExitStatus::Success);
                assert_eq!(result.combined_output, "ran on B2: shell input");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn run_on_all_skips_devices_that_are_not_ready() {
        let dir = TempDir::new().expect("tmp");
        let config = config_with_adb(&dir);

        let reports = run_entry_on_all_with(&config, CommandKind::Adb, "Home".to_string(), "t".to_string())
            .expect("run all")
            .data;
        let serials: Vec<&str> = reports.iter().map(|report| report.serial.as_str()).collect();
        assert_eq!(serials, vec!["A1", "B2"]);
        assert!(reports.iter().all(|report| report.error.is_none()));
    }

    #[test]
    fn submit_entry_delivers_event() {
        let dir = TempDir::new().expect("tmp");
        let config = config_with_adb(&dir);
        let state = AppState::new();
        let (emitter, rx) = channel_emitter();
        let worker = ExecutionWorker::new(Arc::new(CommandExecutor::from_config(&config)), emitter);

        let job = submit_entry_with(
            &config,
            &worker,
            &state,
            CommandKind::Adb,
            "Home".to_string(),
            Some("A1".to_string()),
            "t".to_string(),
        )
        .expect("submit");

        let event = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("event");
        assert_eq!(event.job_id, job.data);
        assert_eq!(event.serial, "A1");
        assert!(event.error.is_none());
    }
}
