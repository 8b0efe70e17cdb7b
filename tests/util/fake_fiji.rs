
use std::fs;
use std::path::{Path, PathBuf};

use thunderstorm_automator::fiji;
use thunderstorm_automator::platform::Platform;


/// What the stand-in Fiji launcher does when run.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
	/// writes the results table (and reconstruction, if the macro asks for one) and exits cleanly
	Analyze,
	/// writes an empty results file and exits cleanly
	EmptyResults,
	/// exits cleanly without writing anything
	Silent,
	/// complains on stderr and exits with the code
	Fail(i32),
	/// never finishes on its own
	Hang
}

impl Behavior {

	pub fn script(&self) -> String {

		let body = match self {

			Behavior::Analyze => r#"
results=$(sed -n 's/.*filepath=\([^ ]*\) .*/\1/p' "$macro")
if [ -n "$results" ]; then
	printf 'id,frame,x [nm],y [nm]\n1,1,10.0,20.0\n2,1,30.5,40.5\n3,2,50.0,60.0\n' > "$results"
fi
image=$(sed -n 's/.*saveAs("Tiff", "\(.*\)");/\1/p' "$macro")
if [ -n "$image" ]; then
	printf 'II*\000' > "$image"
fi
echo "Fiji is working!"
exit 0
"#.to_string(),

			Behavior::EmptyResults => r#"
results=$(sed -n 's/.*filepath=\([^ ]*\) .*/\1/p' "$macro")
: > "$results"
echo "analysis completed"
exit 0
"#.to_string(),

			Behavior::Silent => "exit 0\n".to_string(),

			Behavior::Fail(code) => format!("echo \"fake fiji failed\" >&2\nexit {}\n", code),

			Behavior::Hang => "exec sleep 30\n".to_string()
		};

		format!("#!/bin/sh\nfor arg; do macro=\"$arg\"; done\necho \"fake fiji: $*\"\n{}", body)
	}
}


pub fn write_launcher(path: impl AsRef<Path>, behavior: Behavior) {

	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)
			.expect(&format!("Failed to create dir: {}", parent.to_string_lossy()));
	}
	fs::write(path, behavior.script())
		.expect(&format!("Failed to write launcher: {}", path.to_string_lossy()));

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(path, fs::Permissions::from_mode(0o755))
			.expect(&format!("Failed to chmod launcher: {}", path.to_string_lossy()));
	}
}


/// Lays out `<dir>/Fiji.app` with a launcher and an empty plugins folder, returns the launcher path.
pub fn install(dir: impl AsRef<Path>, behavior: Behavior) -> PathBuf {
	let app_dir = dir.as_ref().join(fiji::APP_DIR);
	fs::create_dir_all(app_dir.join(fiji::PLUGINS_DIR))
		.expect("Failed to create plugins dir");
	let exe = fiji::executable_in(&app_dir, Platform::current());
	write_launcher(&exe, behavior);
	exe
}
