
use std::ffi::OsStr;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use display_error_chain::ErrorChainExt;
use tracing::{debug, trace, warn};


/// The return code reported when the process timed out or couldn't be run at all.
/// Check the stderr message to tell those cases apart.
pub const FAILURE_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(50);


/// The outcome of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
	pub code: i32,
	pub stdout: String,
	pub stderr: String
}

impl ProcessResult {

	pub fn failed(msg: impl Into<String>) -> Self {
		Self {
			code: FAILURE_CODE,
			stdout: String::new(),
			stderr: msg.into()
		}
	}

	pub fn success(&self) -> bool {
		self.code == 0
	}
}


/// Runs the command (program followed by arguments) to completion, capturing its output.
/// If it runs longer than the timeout, it gets killed.
/// Never fails: timeouts and launch problems come back as FAILURE_CODE with a message in stderr.
pub fn run_command<S: AsRef<OsStr>>(argv: &[S], timeout: Duration, cwd: Option<&Path>) -> ProcessResult {
	match try_run(argv, timeout, cwd) {
		Ok(result) => result,
		Err(e) => {
			let msg = e.deref().chain().to_string();
			warn!("{}", msg);
			ProcessResult::failed(msg)
		}
	}
}


fn try_run<S: AsRef<OsStr>>(argv: &[S], timeout: Duration, cwd: Option<&Path>) -> Result<ProcessResult> {

	let Some((program, args)) = argv.split_first()
		else { anyhow::bail!("No command given"); };
	let program = program.as_ref();

	let mut command = Command::new(program);
	command.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped());
	if let Some(cwd) = cwd {
		command.current_dir(cwd);
	}

	debug!("Running: {:?}", command);
	let mut child = command.spawn()
		.context(format!("Failed to launch {}", program.to_string_lossy()))?;

	// drain the pipes on other threads, so a chatty process can't fill the pipe buffers and stall
	let stdout = child.stdout.take().map(drain);
	let stderr = child.stderr.take().map(drain);

	let started = Instant::now();
	loop {

		let exit = child.try_wait()
			.context("Failed to check status of process")?;
		if let Some(exit) = exit {
			trace!("Process {} exited: {:?}", child.id(), exit);
			return Ok(ProcessResult {
				// no exit code means a signal killed it
				code: exit.code().unwrap_or(FAILURE_CODE),
				stdout: collect(stdout),
				stderr: collect(stderr)
			});
		}

		let elapsed = started.elapsed();
		if elapsed >= timeout {
			kill(&mut child);
			// the reader threads might be held up by grandchildren still holding the pipes, so just abandon them
			return Ok(ProcessResult::failed(format!("Process timed out after {:.1} s", timeout.as_secs_f64())));
		}

		thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
	}
}


fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
	thread::spawn(move || {
		let mut buf = Vec::new();
		pipe.read_to_end(&mut buf)
			.map_err(|e| warn!("Failed to read process output: {}", e))
			.ok();
		buf
	})
}


fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
	reader
		.and_then(|handle| handle.join().ok())
		.map(|buf| String::from_utf8_lossy(&buf).to_string())
		.unwrap_or_default()
}


fn kill(child: &mut Child) {
	debug!("Killing process {}", child.id());
	child.kill()
		.map_err(|e| warn!("Failed to kill process {}: {}", child.id(), e))
		.ok();
	child.wait()
		.map_err(|e| warn!("Failed to reap process {}: {}", child.id(), e))
		.ok();
}


/// Checks whether a process with the given name is running, using the platform's process lister.
pub fn is_process_running(name: &str) -> bool {

	let result =
		if cfg!(target_os = "windows") {
			let filter = format!("IMAGENAME eq {}", name);
			run_command(&["tasklist", "/FI", filter.as_str()], Duration::from_secs(10), None)
		} else {
			run_command(&["pgrep", "-f", name], Duration::from_secs(10), None)
		};

	if cfg!(target_os = "windows") {
		result.success() && result.stdout.contains(name)
	} else {
		result.success() && !result.stdout.trim().is_empty()
	}
}
