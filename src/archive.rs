
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{info, warn};
use zip::ZipArchive;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
	Zip,
	Tar,
	TarGz
}

impl ArchiveKind {

	pub fn detect(path: &Path) -> Option<Self> {
		let name = path.file_name()?
			.to_string_lossy()
			.to_lowercase();
		if name.ends_with(".zip") {
			Some(ArchiveKind::Zip)
		} else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
			Some(ArchiveKind::TarGz)
		} else if name.ends_with(".tar") {
			Some(ArchiveKind::Tar)
		} else {
			None
		}
	}
}


/// Extracts the archive into the destination folder, choosing the format by file extension.
/// Failures, including unsupported formats, are logged and reported as false.
pub fn extract(archive: impl AsRef<Path>, dest: impl AsRef<Path>, description: &str) -> bool {

	let (archive, dest) = (archive.as_ref(), dest.as_ref());
	info!("Extracting {} ...", description);

	match extract_archive(archive, dest) {
		Ok(count) => {
			info!("Extracted {} successfully ({} entries)", description, count);
			true
		}
		Err(e) => {
			warn!("Failed to extract {}: {:#}", description, e);
			false
		}
	}
}


pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {

	let Some(kind) = ArchiveKind::detect(archive)
		else { bail!("Unsupported archive format: {}", archive.to_string_lossy()); };

	fs::create_dir_all(dest)
		.context(format!("Failed to create {}", dest.to_string_lossy()))?;

	let file = File::open(archive)
		.context(format!("Failed to open {}", archive.to_string_lossy()))?;

	match kind {
		ArchiveKind::Zip => extract_zip(file, dest),
		ArchiveKind::Tar => extract_tar(file, dest),
		ArchiveKind::TarGz => extract_tar(GzDecoder::new(file), dest)
	}
}


fn extract_zip(file: File, dest: &Path) -> Result<usize> {

	let mut archive = ZipArchive::new(file)
		.context("Failed to read zip archive")?;

	for i in 0 .. archive.len() {

		let mut entry = archive.by_index(i)
			.context("Failed to read zip entry")?;
		let raw = entry.name().replace('\\', "/");
		let out = dest.join(entry_path(Path::new(&raw))?);

		if entry.is_dir() {
			fs::create_dir_all(&out)
				.context(format!("Failed to create {}", out.to_string_lossy()))?;
			continue;
		}

		if let Some(parent) = out.parent() {
			fs::create_dir_all(parent)
				.context(format!("Failed to create {}", parent.to_string_lossy()))?;
		}
		let mut out_file = File::create(&out)
			.context(format!("Failed to create {}", out.to_string_lossy()))?;
		io::copy(&mut entry, &mut out_file)
			.context(format!("Failed to extract {}", out.to_string_lossy()))?;

		// keep executables executable
		#[cfg(unix)]
		if let Some(mode) = entry.unix_mode() {
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(&out, fs::Permissions::from_mode(mode & 0o7777))
				.context(format!("Failed to set permissions on {}", out.to_string_lossy()))?;
		}
	}

	Ok(archive.len())
}


fn extract_tar(reader: impl io::Read, dest: &Path) -> Result<usize> {

	let mut archive = Archive::new(reader);
	archive.set_preserve_permissions(true);

	let mut count = 0;
	for entry in archive.entries().context("Failed to read tar entries")? {

		let mut entry = entry
			.context("Failed to read tar entry")?;
		let raw = entry.path()
			.context("Failed to read tar entry path")?
			.to_path_buf();
		let out = dest.join(entry_path(&raw)?);

		if entry.header().entry_type().is_dir() {
			fs::create_dir_all(&out)
				.context(format!("Failed to create {}", out.to_string_lossy()))?;
		} else {
			if let Some(parent) = out.parent() {
				fs::create_dir_all(parent)
					.context(format!("Failed to create {}", parent.to_string_lossy()))?;
			}
			entry.unpack(&out)
				.context(format!("Failed to extract {}", out.to_string_lossy()))?;
		}
		count += 1;
	}

	Ok(count)
}


/// Turns an archive entry name into a relative path that can't escape the destination.
fn entry_path(path: &Path) -> Result<PathBuf> {

	let mut cleaned = PathBuf::new();
	for component in path.components() {
		match component {
			Component::Prefix(_) | Component::RootDir | Component::ParentDir =>
				bail!("Archive entry escapes destination: {}", path.to_string_lossy()),
			Component::CurDir => (),
			Component::Normal(part) => cleaned.push(part)
		}
	}

	if cleaned.as_os_str().is_empty() {
		bail!("Archive entry has an empty path");
	}

	Ok(cleaned)
}
