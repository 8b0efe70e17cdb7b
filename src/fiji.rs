
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::logging::ResultExt;
use crate::platform::Platform;
use crate::process::{self, ProcessResult};
use crate::script::{Expr, Script, Statement};


pub const APP_DIR: &'static str = "Fiji.app";
pub const PLUGINS_DIR: &'static str = "plugins";


/// Where the launcher lives inside the Fiji.app folder.
pub fn executable_relative(platform: Platform) -> PathBuf {
	match platform {
		Platform::Windows => PathBuf::from("ImageJ-win64.exe"),
		Platform::Darwin => ["Contents", "MacOS", "ImageJ-macosx"].iter().collect(),
		Platform::Linux => PathBuf::from("ImageJ-linux64")
	}
}


pub fn executable_in(app_dir: impl AsRef<Path>, platform: Platform) -> PathBuf {
	app_dir.as_ref().join(executable_relative(platform))
}


/// The headless invocation: `<exe> --headless --console --run <macro>`
pub fn headless_command(executable: &Path, macro_path: &Path) -> Vec<OsString> {
	vec![
		executable.as_os_str().to_owned(),
		"--headless".into(),
		"--console".into(),
		"--run".into(),
		macro_path.as_os_str().to_owned()
	]
}


pub fn run_macro(executable: &Path, macro_path: &Path, timeout: Duration) -> ProcessResult {
	let command = headless_command(executable, macro_path);
	info!("Command: {}", command.iter()
		.map(|arg| arg.to_string_lossy())
		.collect::<Vec<_>>()
		.join(" ")
	);
	process::run_command(&command, timeout, None)
}


/// A trivial macro that only proves Fiji can start and run scripts.
pub fn smoke_test_script() -> Script {
	let mut script = Script::new();
	script
		.push(Statement::print("Fiji is working!"))
		.push(Statement::Print(vec![
			Expr::Text("ImageJ version: ".to_string()),
			Expr::Call("getVersion".to_string())
		]));
	script
}


/// Runs the smoke test macro headless and checks for a zero exit code.
pub fn smoke_test(executable: &Path, timeout: Duration) -> bool {

	info!("Testing Fiji execution: {}", executable.to_string_lossy());

	let Ok(macro_file) = write_temp_macro(&smoke_test_script())
		.context("Failed to write smoke test macro")
		.warn_err()
		else { return false; };

	let result = run_macro(executable, macro_file.path(), timeout);
	if result.success() {
		info!("Fiji execution test passed");
		if !result.stdout.trim().is_empty() {
			info!("Fiji output: {}", result.stdout.trim());
		}
		true
	} else {
		warn!("Fiji execution test failed with code {}", result.code);
		if !result.stderr.trim().is_empty() {
			warn!("Fiji error output: {}", result.stderr.trim());
		}
		false
	}
}


fn write_temp_macro(script: &Script) -> Result<tempfile::NamedTempFile> {
	let mut file = tempfile::Builder::new()
		.prefix("smoke_test_")
		.suffix(".ijm")
		.tempfile()
		.context("Failed to create temporary macro file")?;
	file.write_all(script.to_string().as_bytes())
		.context("Failed to write temporary macro file")?;
	file.flush()
		.context("Failed to flush temporary macro file")?;
	Ok(file)
}
