
mod util;


use galvanic_assert::{assert_that, matchers::*};
use indoc::indoc;
use predicates::prelude::*;
use serde_json::Value;

use crate::util::cmd::{cmd, AssertExt};
use crate::util::work_dir::WorkDir;


#[test]
fn help() {
	cmd()
		.arg("--help")
		.assert()
		.print_stdout()
		.success()
		.stdout(predicate::str::contains("analyze"))
		.stdout(predicate::str::contains("make-stack"));
}


#[test]
fn version() {
	cmd()
		.arg("--version")
		.assert()
		.print_stdout()
		.success()
		.stdout(predicate::str::contains(format!("thunderstorm-automator version {}", env!("CARGO_PKG_VERSION"))));
}


#[test]
fn no_command() {
	cmd()
		.assert()
		.print_stdout()
		.failure()
		.stdout(predicate::str::contains("No command"));
}


#[test]
fn show_config() {
	cmd()
		.arg("config")
		.assert()
		.print_stdout()
		.print_stderr()
		.success()
		.stdout(predicate::str::contains("Platform:"))
		.stdout(predicate::str::contains("\"github_api_url\""))
		.stdout(predicate::str::contains("Overrides: (none)"));
}


#[test]
fn config_overrides_and_save() {
	let dir = WorkDir::new();
	let overrides = dir.file("overrides.json");
	overrides.write(indoc! { r#"
		{ "analysis": { "timeout": 77 } }
	"# });
	let saved = dir.file("saved.json");

	cmd()
		.arg("--config").arg(overrides.path())
		.arg("config")
		.arg("--save").arg(saved.path())
		.assert()
		.print_stdout()
		.print_stderr()
		.success()
		.stdout(predicate::str::contains("\"timeout\": 77"));

	let json = serde_json::from_str::<Value>(&saved.read())
		.expect("saved config isn't JSON");
	assert_that!(&json["analysis"]["timeout"].as_u64(), eq(Some(77)));
	assert_that!(&json["thunderstorm"]["default_parameters"]["sigma"].as_f64(), eq(Some(1.6)));
}


#[test]
fn broken_config_file_is_not_fatal() {
	let dir = WorkDir::new();
	let overrides = dir.file("broken.json");
	overrides.write("{ nope");

	cmd()
		.arg("--config").arg(overrides.path())
		.arg("config")
		.assert()
		.print_stdout()
		.success()
		.stdout(predicate::str::contains("\"timeout\": 300"));
}


#[test]
fn make_stack_and_info() {
	let dir = WorkDir::new();
	let stack = dir.path().join("stack.tif");

	cmd()
		.arg("make-stack")
		.arg("--width").arg("20")
		.arg("--height").arg("10")
		.arg("--frames").arg("3")
		.arg(&stack)
		.assert()
		.print_stdout()
		.print_stderr()
		.success();

	cmd()
		.arg("info")
		.arg(&stack)
		.assert()
		.print_stdout()
		.success()
		.stdout(predicate::str::contains("Valid TIFF: true"))
		.stdout(predicate::str::contains("Dimensions: 20x10"))
		.stdout(predicate::str::contains("Frames:     3"));
}


#[test]
fn info_missing() {
	let dir = WorkDir::new();
	cmd()
		.arg("info")
		.arg(dir.path().join("missing.tif"))
		.assert()
		.print_stdout()
		.failure()
		.stdout(predicate::str::contains("File not found"));
}


#[test]
fn check_missing_fiji() {
	let dir = WorkDir::new();
	cmd()
		.arg("check")
		.arg("--fiji").arg(dir.path().join("ImageJ-linux64"))
		.assert()
		.print_stdout()
		.failure()
		.stdout(predicate::str::contains("Fiji executable not found"));
}


#[test]
fn bad_param() {
	let dir = WorkDir::new();
	cmd()
		.arg("analyze")
		.arg("--param").arg("no_equals_sign")
		.arg(dir.path().join("in.tif"))
		.arg(dir.path().join("out"))
		.assert()
		.print_stdout()
		.print_stderr()
		.failure();
}


#[cfg(unix)]
mod with_fiji {

	use super::*;

	use crate::util::fake_fiji::{self, Behavior};


	#[test]
	fn check() {
		let dir = WorkDir::new();
		let exe = fake_fiji::install(dir.path(), Behavior::Analyze);
		cmd()
			.arg("check")
			.arg("--fiji").arg(&exe)
			.assert()
			.print_stdout()
			.success()
			.stdout(predicate::str::contains("Fiji is ready"));
	}


	#[test]
	fn analyze() {
		let dir = WorkDir::new();
		let exe = fake_fiji::install(dir.path(), Behavior::Analyze);
		let stack = dir.path().join("stack.tif");
		let out = dir.path().join("out");

		cmd()
			.arg("make-stack")
			.arg(&stack)
			.assert()
			.success();

		cmd()
			.arg("analyze")
			.arg("--fiji").arg(&exe)
			.arg("--param").arg("pixel_size=65.0")
			.arg("--param").arg("create_reconstructed_image=false")
			.arg(&stack)
			.arg(&out)
			.assert()
			.print_stdout()
			.print_stderr()
			.success()
			.stdout(predicate::str::contains("3 localizations"));

		let script = dir.file("out/thunderstorm_macro.ijm").read();
		assert_that!(&script.contains("camera.pixelsize=65.0"), eq(true));
		assert_that!(&script.contains("Visualization"), eq(false));
		assert_that!(&dir.file("out/results.csv").exists(), eq(true));
	}


	#[test]
	fn analyze_fails() {
		let dir = WorkDir::new();
		let exe = fake_fiji::install(dir.path(), Behavior::Fail(2));
		let stack = dir.path().join("stack.tif");

		cmd()
			.arg("make-stack")
			.arg(&stack)
			.assert()
			.success();

		cmd()
			.arg("analyze")
			.arg("--fiji").arg(&exe)
			.arg(&stack)
			.arg(dir.path().join("out"))
			.assert()
			.print_stdout()
			.failure()
			.stdout(predicate::str::contains("exited with code 2"));
	}


	#[test]
	fn analyze_times_out() {
		let dir = WorkDir::new();
		let exe = fake_fiji::install(dir.path(), Behavior::Hang);
		let stack = dir.path().join("stack.tif");

		cmd()
			.arg("make-stack")
			.arg(&stack)
			.assert()
			.success();

		cmd()
			.arg("analyze")
			.arg("--fiji").arg(&exe)
			.arg("--timeout").arg("1")
			.arg(&stack)
			.arg(dir.path().join("out"))
			.assert()
			.print_stdout()
			.failure()
			.stdout(predicate::str::contains("timed out"));
	}
}
