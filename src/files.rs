
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::logging::ResultExt;


const PROBE_FILENAME: &'static str = "test_write_permission.tmp";


pub fn ensure_directory(path: impl AsRef<Path>) -> Result<PathBuf> {
	let path = path.as_ref();
	fs::create_dir_all(path)
		.context(format!("Failed to create folder: {}", path.to_string_lossy()))?;
	Ok(path.to_path_buf())
}


/// Checks for write permission by actually writing (and removing) a probe file.
/// Folders that don't exist aren't writable.
pub fn check_permissions(dir: impl AsRef<Path>) -> bool {
	let probe = dir.as_ref().join(PROBE_FILENAME);
	match fs::write(&probe, b"") {
		Ok(()) => {
			fs::remove_file(&probe)
				.context(format!("Failed to remove permission probe: {}", probe.to_string_lossy()))
				.warn_err()
				.ok();
			true
		}
		Err(e) => {
			debug!("Permission probe failed at {}: {}", probe.to_string_lossy(), e);
			false
		}
	}
}


/// Finds the closest folder at or above the path that already exists.
pub fn nearest_existing_ancestor(path: &Path) -> Option<&Path> {
	path.ancestors()
		.find(|p| !p.as_os_str().is_empty() && p.is_dir())
}


/// Converts a path for use inside an ImageJ macro: all backslashes become forward slashes.
pub fn sanitize_path(path: impl AsRef<Path>) -> String {
	path.as_ref()
		.to_string_lossy()
		.replace('\\', "/")
}


/// Finds the files in the folder matching the glob pattern, eg `*.jar`.
/// A missing folder has no files.
pub fn find_files(dir: impl AsRef<Path>, pattern: &str) -> Vec<PathBuf> {

	let dir = dir.as_ref();
	if !dir.is_dir() {
		return vec![];
	}

	// escape the folder part, so only the pattern gets interpreted
	let full_pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
	let paths = match glob::glob(&full_pattern) {
		Ok(paths) => paths,
		Err(e) => {
			warn!("Invalid file pattern {}: {}", pattern, e);
			return vec![];
		}
	};

	let mut files = paths
		.filter_map(|entry| {
			entry
				.map_err(|e| warn!("Failed to read file while searching: {}", e))
				.ok()
		})
		.collect::<Vec<_>>();
	files.sort();
	files
}


pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
	let (src, dst) = (src.as_ref(), dst.as_ref());
	fs::copy(src, dst)
		.context(format!("Failed to copy {} to {}", src.to_string_lossy(), dst.to_string_lossy()))?;
	Ok(())
}


pub fn remove_file(path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	fs::remove_file(path)
		.context(format!("Failed to remove file: {}", path.to_string_lossy()))
}


#[cfg(unix)]
pub fn make_executable(path: impl AsRef<Path>) -> Result<()> {
	use std::os::unix::fs::PermissionsExt;
	let path = path.as_ref();
	fs::set_permissions(path, fs::Permissions::from_mode(0o755))
		.context(format!("Failed to make executable: {}", path.to_string_lossy()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: impl AsRef<Path>) -> Result<()> {
	Ok(())
}
