//! Subprocess invocation with per-phase timeouts.
//!
//! Compile, link, strip, and preprocess all go through [`run_command`].
//! Output is drained on reader threads so a chatty child cannot deadlock
//! against a full pipe, and a child that outlives its deadline is killed
//! and reported as timed out rather than failing the whole job.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::builder::receipt::PhaseStatus;

/// Captured outcome of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Exit code; -1 when the process was killed or never produced one.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub status: PhaseStatus,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status == PhaseStatus::Success
    }

    fn spawn_failure(message: String, started: Instant) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: message,
            duration_ms: started.elapsed().as_millis() as u64,
            status: PhaseStatus::Failed,
        }
    }
}

/// Render a command line for receipts and logs.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

/// Run `program` with `args` in `cwd`, killing it after `timeout`.
///
/// Never panics and never returns an error: every failure mode is encoded
/// in the returned [`CommandOutcome`] so the caller can record it in the
/// receipt and continue with the rest of the job.
pub fn run_command(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> CommandOutcome {
    let started = Instant::now();

    let mut child = match Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return CommandOutcome::spawn_failure(format!("failed to spawn {program}: {e}"), started)
        }
    };

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let mut timed_out = false;
    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if started.elapsed() >= timeout {
                    timed_out = true;
                    let _ = child.kill();
                    break child.wait().ok();
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(_) => break None,
        }
    };

    let stdout = String::from_utf8_lossy(&stdout_thread.join().unwrap_or_default()).to_string();
    let stderr = String::from_utf8_lossy(&stderr_thread.join().unwrap_or_default()).to_string();
    let duration_ms = started.elapsed().as_millis() as u64;

    let exit_code = exit_status.and_then(|s| s.code()).unwrap_or(-1);
    let status = if timed_out {
        PhaseStatus::Timeout
    } else if exit_code == 0 {
        PhaseStatus::Success
    } else {
        PhaseStatus::Failed
    };

    CommandOutcome { exit_code, stdout, stderr, duration_ms, status }
}

/// Probe a tool's version string: first line of `program <arg>` stdout.
pub fn probe_version(program: &str, arg: &str, cwd: &Path) -> String {
    let outcome = run_command(program, &[arg.to_string()], cwd, Duration::from_secs(10));
    if !outcome.success() {
        return "unknown".to_string();
    }
    outcome.stdout.lines().next().unwrap_or("unknown").trim().to_string()
}
