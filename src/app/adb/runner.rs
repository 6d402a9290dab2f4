use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl CommandOutput {
    /// Stdout followed by stderr, trailing whitespace removed from each.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs `program` with `args` directly (no shell) and captures both streams.
///
/// `None` waits for the child however long it takes.
pub fn run_command(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            AppError::process_launch(format!("Failed to start {program}: {err}"), trace_id)
        })?;

    // Drain stdout/stderr in parallel; a chatty child blocks once a pipe buffer fills.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = std::thread::spawn(move || drain(stdout));
    let stderr_handle = std::thread::spawn(move || drain(stderr));

    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if let Some(limit) = timeout {
                    if start.elapsed() > limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        // Readers are left to finish on their own: a grandchild may still
                        // hold the pipes open.
                        drop(stdout_handle);
                        drop(stderr_handle);
                        return Err(AppError::timeout(
                            format!("{program} did not finish within {}ms", limit.as_millis()),
                            trace_id,
                        ));
                    }
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                let _ = child.kill();
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(
                    format!("Failed to poll {program}: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
        duration: start.elapsed(),
    })
}

fn drain(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 4096];
    loop {
        match reader.read(&mut temp) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&temp[..count]),
            Err(_) => break,
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(0),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn combines_streams() {
        assert_eq!(output("a\n", "").combined(), "a");
        assert_eq!(output("", "error: no device\n").combined(), "error: no device");
        assert_eq!(output("out\n", "err\n").combined(), "out\nerr");
        assert_eq!(output("\n", "  \n").combined(), "");
    }

    #[test]
    fn missing_binary_is_launch_error() {
        let err = run_command("/no/such/binary/adb", &[], None, "trace-launch").unwrap_err();
        assert_eq!(err.code, "ERR_PROCESS_LAUNCH");
        assert_eq!(err.trace_id, "trace-launch");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_returned_as_data() {
        let args = vec![
            "-c".to_string(),
            "echo 'error: no device' >&2; exit 1".to_string(),
        ];
        let output = run_command("sh", &args, None, "t").expect("runs");
        assert_eq!(output.exit_code, Some(1));
        assert!(!output.success());
        assert_eq!(output.combined(), "error: no device");
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_child() {
        let args = vec!["-c".to_string(), "exec sleep 30".to_string()];
        let started = Instant::now();
        let err = run_command("sh", &args, Some(Duration::from_millis(200)), "t").unwrap_err();
        assert_eq!(err.code, "ERR_TIMEOUT");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn does_not_deadlock_on_large_stdout() {
        // If the pipes are not drained, the child blocks once the buffer fills.
        let (program, args) = if cfg!(windows) {
            (
                "cmd.exe",
                vec![
                    "/C".to_string(),
                    "for /L %i in (1,1,100000) do @echo 1234567890".to_string(),
                ],
            )
        } else {
            (
                "sh",
                vec![
                    "-c".to_string(),
                    "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done"
                        .to_string(),
                ],
            )
        };

        let output = run_command(program, &args, Some(Duration::from_secs(30)), "t")
            .expect("expected large-output command to complete without timing out");

        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.len() >= 1_000_000, "got {}", output.stdout.len());
    }
}
