
use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::TempDir;
use galvanic_assert::{assert_that, matchers::*};


/// A scratch folder for one test, removed when dropped.
pub struct WorkDir {
	dir: TempDir
}

impl WorkDir {

	pub fn new() -> WorkDir {
		Self {
			dir: TempDir::new()
				.expect("Failed to make temp folder")
		}
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn file(&self, path: impl AsRef<Path>) -> WorkFile {
		WorkFile {
			_dir: self,
			path: self.dir.path().join(path.as_ref())
		}
	}

	pub fn subdir(&self, path: impl AsRef<Path>) -> PathBuf {
		let path = self.dir.path().join(path.as_ref());
		fs::create_dir_all(&path)
			.expect(&format!("Failed to create dir: {}", path.to_string_lossy()));
		path
	}

	/// a file:// URL for a path in this folder
	pub fn url(&self, path: impl AsRef<Path>) -> String {
		reqwest::Url::from_file_path(self.dir.path().join(path.as_ref()))
			.expect("Failed to make file URL")
			.to_string()
	}

	pub fn print(&self) {
		let path = self.dir.path();
		println!("Work Folder: {}", path.to_string_lossy());
		let dir = fs::read_dir(path)
			.expect(&format!("Failed to read dir: {}", path.to_string_lossy()));
		for entry in dir {
			match entry {
				Ok(entry) => println!("\t{}", entry.file_name().to_string_lossy()),
				Err(e) => println!("\tError: {}", e)
			}
		}
	}
}

impl AsRef<Path> for WorkDir {
	fn as_ref(&self) -> &Path {
		self.dir.path()
	}
}


pub struct WorkFile<'d> {
	_dir: &'d WorkDir,
	path: PathBuf
}

impl<'d> WorkFile<'d> {

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn write(&self, txt: impl AsRef<str>) {
		self.write_bytes(txt.as_ref().as_bytes());
	}

	pub fn write_bytes(&self, bytes: impl AsRef<[u8]>) {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.expect(&format!("Failed to create dir: {}", parent.to_string_lossy()));
		}
		fs::write(self.path(), bytes.as_ref())
			.expect(&format!("Failed to write file: {}", self.path().to_string_lossy()));
	}

	pub fn exists(&self) -> bool {
		self.path.exists()
	}

	pub fn read(&self) -> String {
		fs::read_to_string(self.path())
			.expect(&format!("Failed to read file: {}", self.path().to_string_lossy()))
	}

	pub fn assert_eq(&self, exp: impl AsRef<str>) {
		let obs = self.read();
		let exp = exp.as_ref();
		assert_that!(&obs.as_str(), eq(exp));
	}
}
