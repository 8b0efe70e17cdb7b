
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::Platform;


/// Conditions that stop the automator before (or instead of) launching Fiji.
#[derive(Debug, Error)]
pub enum AutomatorError {

	#[error("Fiji executable not found{}\n{}", describe_override(.path), remediation(.searched))]
	ExecutableNotFound {
		/// the explicitly requested executable, if any
		path: Option<PathBuf>,
		/// the conventional locations that were probed
		searched: Vec<PathBuf>
	},

	#[error("Input file not found: {}", .0.to_string_lossy())]
	InputNotFound(PathBuf),

	/// ThunderSTORM's option strings have no way to escape `[` or `]`
	#[error("Can't pass this path to ThunderSTORM, please choose one without [ or ]: {}", .0.to_string_lossy())]
	UnrepresentablePath(PathBuf),

	#[error("Failed to create output folder: {}", .path.to_string_lossy())]
	OutputDir {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("Failed to write macro file: {}", .path.to_string_lossy())]
	WriteMacro {
		path: PathBuf,
		#[source]
		source: io::Error
	}
}


fn describe_override(path: &Option<PathBuf>) -> String {
	match path {
		Some(path) => format!(" at: {}", path.to_string_lossy()),
		None => " in any of the conventional locations".to_string()
	}
}


fn remediation(searched: &[PathBuf]) -> String {
	let mut msg = String::from("Please ensure Fiji is installed (try the `setup` command) or pass the executable path explicitly.");
	if !searched.is_empty() {
		msg.push_str("\nSearched:");
		for path in searched {
			msg.push_str(&format!("\n\t{}", path.to_string_lossy()));
		}
	}
	msg
}


/// The step of the installation that failed. Nothing is rolled back.
#[derive(Debug, Error)]
pub enum SetupError {

	#[error("No write permissions to {}\nPlease run as administrator/sudo or choose a different folder", .0.to_string_lossy())]
	PermissionDenied(PathBuf),

	#[error("Failed to create folder: {}", .path.to_string_lossy())]
	CreateDir {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("No Fiji download URL configured for platform: {0}")]
	UnsupportedPlatform(Platform),

	#[error("Failed to download {what} from {url}")]
	Download {
		what: String,
		url: String
	},

	#[error("Failed to extract {}", .0.to_string_lossy())]
	Extract(PathBuf),

	#[error("Expected folder missing after extraction: {}", .0.to_string_lossy())]
	MissingAfterExtract(PathBuf),

	#[error("Failed to get plugin release info: {0}")]
	ReleaseLookup(String),

	#[error("No release asset matching *{filter}*{extension} in the latest plugin release")]
	PluginAssetNotFound {
		filter: String,
		extension: String
	},

	#[error("Failed to remove existing installation: {}", .path.to_string_lossy())]
	RemoveExisting {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("Existing installation found at {}, aborting", .0.to_string_lossy())]
	Aborted(PathBuf),

	#[error("Installation verification failed: {0}")]
	Verification(String)
}
