
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::archive;
use crate::config::Config;
use crate::download;
use crate::error::SetupError;
use crate::fiji;
use crate::files;
use crate::logging::ResultExt;
use crate::platform::Platform;


/// What to do when something is already installed where we want to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
	/// ask on the terminal
	Prompt,
	/// remove the existing files and install again
	Overwrite,
	/// leave the existing files alone and carry on
	Keep,
	/// stop the installation
	Abort
}

impl FromStr for OnConflict {

	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self,Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"prompt" => Ok(OnConflict::Prompt),
			"overwrite" => Ok(OnConflict::Overwrite),
			"keep" => Ok(OnConflict::Keep),
			"abort" => Ok(OnConflict::Abort),
			other => bail!("Unrecognized conflict mode: {}, try one of: prompt, overwrite, keep, abort", other)
		}
	}
}

impl fmt::Display for OnConflict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			OnConflict::Prompt => "prompt",
			OnConflict::Overwrite => "overwrite",
			OnConflict::Keep => "keep",
			OnConflict::Abort => "abort"
		})
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
	pub name: String,
	pub download_url: String
}


/// Reads the assets out of a release listing: `{"assets": [{"name": ..., "browser_download_url": ...}]}`
pub fn parse_release_assets(release: &Value) -> Result<Vec<ReleaseAsset>> {

	let assets = release.get("assets")
		.context("Missing assets")?
		.as_array()
		.context("assets was not a list")?;

	assets.iter()
		.map(|asset| {
			let name = asset.get("name")
				.context("Missing asset name")?
				.as_str()
				.context("asset name was not a string")?;
			let download_url = asset.get("browser_download_url")
				.context("Missing asset browser_download_url")?
				.as_str()
				.context("asset browser_download_url was not a string")?;
			Ok(ReleaseAsset {
				name: name.to_string(),
				download_url: download_url.to_string()
			})
		})
		.collect()
}


/// Case-insensitive substring match that also ignores `_`, `-` and spaces,
/// so `thunderstorm` matches `Thunder_STORM.jar`.
pub fn name_matches(name: &str, filter: &str) -> bool {
	fn normalize(s: &str) -> String {
		s.chars()
			.filter(|c| !matches!(c, '_' | '-' | ' '))
			.flat_map(char::to_lowercase)
			.collect()
	}
	normalize(name).contains(&normalize(filter))
}


/// Picks the first asset with the extension whose name matches the filter.
pub fn select_asset<'a>(assets: &'a [ReleaseAsset], extension: &str, filter: &str) -> Option<&'a ReleaseAsset> {
	let extension = extension.to_lowercase();
	assets.iter()
		.find(|asset| {
			asset.name.to_lowercase().ends_with(&extension)
				&& name_matches(&asset.name, filter)
		})
}


/// Downloads and installs Fiji and the ThunderSTORM plugin into a folder.
pub struct Installer<'c> {
	config: &'c Config,
	platform: Platform,
	install_dir: PathBuf,
	app_dir: PathBuf,
	plugins_dir: PathBuf,
	on_conflict: OnConflict
}

impl<'c> Installer<'c> {

	/// Installs into the given folder, or the platform default from the config.
	pub fn new(config: &'c Config, install_dir: Option<PathBuf>) -> Self {

		let install_dir = install_dir
			.unwrap_or_else(|| config.default_install_dir());
		let app_dir = install_dir.join(fiji::APP_DIR);
		let plugins_dir = app_dir.join(fiji::PLUGINS_DIR);

		let on_conflict = config.get_str("setup.on_conflict")
			.map(|mode| {
				mode.parse::<OnConflict>()
					.context("Bad setup.on_conflict config value, will prompt instead")
					.warn_err()
					.unwrap_or(OnConflict::Prompt)
			})
			.unwrap_or(OnConflict::Prompt);

		Self {
			config,
			platform: config.platform(),
			install_dir,
			app_dir,
			plugins_dir,
			on_conflict
		}
	}

	pub fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
		self.on_conflict = on_conflict;
		self
	}

	pub fn install_dir(&self) -> &Path {
		&self.install_dir
	}

	pub fn app_dir(&self) -> &Path {
		&self.app_dir
	}

	pub fn plugins_dir(&self) -> &Path {
		&self.plugins_dir
	}

	pub fn on_conflict(&self) -> OnConflict {
		self.on_conflict
	}

	pub fn executable(&self) -> PathBuf {
		fiji::executable_in(&self.app_dir, self.platform)
	}

	/// Checks the install folder is writable.
	/// A folder that doesn't exist yet is judged by the closest existing folder above it,
	/// since that's where it would get created.
	pub fn check_permissions(&self) -> bool {
		match files::nearest_existing_ancestor(&self.install_dir) {
			Some(dir) => files::check_permissions(dir),
			None => false
		}
	}

	/// Runs every step in order, stopping at the first failure. Nothing is rolled back.
	pub fn setup_all(&self) -> Result<(),SetupError> {

		info!("Fiji and ThunderSTORM setup");
		info!("Platform: {}", self.platform);
		info!("Installation folder: {}", self.install_dir.to_string_lossy());

		if !self.check_permissions() {
			return Err(SetupError::PermissionDenied(self.install_dir.clone()));
		}

		fs::create_dir_all(&self.install_dir)
			.map_err(|source| SetupError::CreateDir {
				path: self.install_dir.clone(),
				source
			})?;

		self.install_fiji()?;
		self.install_plugin()?;
		self.verify_installation()?;

		info!("Setup completed successfully");
		info!("Fiji installed at: {}", self.app_dir.to_string_lossy());
		info!("ThunderSTORM plugin installed in: {}", self.plugins_dir.to_string_lossy());

		Ok(())
	}

	pub fn install_fiji(&self) -> Result<(),SetupError> {

		info!("Setting up Fiji for {} ...", self.platform);

		if self.app_dir.exists() {
			info!("Fiji already exists at {}", self.app_dir.to_string_lossy());
			if !self.resolve_conflict(&self.app_dir)? {
				return Ok(());
			}
			info!("Removing existing Fiji installation ...");
			fs::remove_dir_all(&self.app_dir)
				.map_err(|source| SetupError::RemoveExisting {
					path: self.app_dir.clone(),
					source
				})?;
		}

		let url = self.config.fiji_url()
			.ok_or(SetupError::UnsupportedPlatform(self.platform))?;

		// stage the download in a temporary folder that cleans itself up
		let staging = tempfile::TempDir::new()
			.map_err(|source| SetupError::CreateDir {
				path: std::env::temp_dir(),
				source
			})?;
		let archive_path = staging.path().join(archive_name(url, self.platform));

		if !download::download(url, &archive_path, "Fiji") {
			return Err(SetupError::Download {
				what: "Fiji".to_string(),
				url: url.to_string()
			});
		}

		if !archive::extract(&archive_path, &self.install_dir, "Fiji") {
			return Err(SetupError::Extract(archive_path));
		}

		if !self.app_dir.is_dir() {
			return Err(SetupError::MissingAfterExtract(self.app_dir.clone()));
		}
		info!("Fiji installed successfully at {}", self.app_dir.to_string_lossy());

		if self.platform.is_unix() {
			let exe = self.executable();
			if exe.exists() {
				files::make_executable(&exe)
					.warn_err()
					.ok();
			}
		}

		Ok(())
	}

	/// Looks up the plugin jar in the latest release listing.
	pub fn plugin_release(&self) -> Result<ReleaseAsset,SetupError> {

		let api_url = self.config.plugin_api_url()
			.ok_or_else(|| SetupError::ReleaseLookup("no release API URL configured".to_string()))?;
		let extension = self.config.plugin_asset_extension();
		let filter = self.config.plugin_asset_filter();

		let assets = download::fetch_json(api_url)
			.and_then(|release| parse_release_assets(&release))
			.map_err(|e| SetupError::ReleaseLookup(format!("{:#}", e)))?;

		select_asset(&assets, extension, filter)
			.cloned()
			.ok_or_else(|| SetupError::PluginAssetNotFound {
				filter: filter.to_string(),
				extension: extension.to_string()
			})
	}

	/// the plugin jars already in the plugins folder
	pub fn installed_plugins(&self) -> Vec<PathBuf> {
		let extension = self.config.plugin_asset_extension();
		let filter = self.config.plugin_asset_filter();
		files::find_files(&self.plugins_dir, &format!("*{}", extension))
			.into_iter()
			.filter(|path| {
				path.file_name()
					.map(|name| name_matches(&name.to_string_lossy(), filter))
					.unwrap_or(false)
			})
			.collect()
	}

	pub fn install_plugin(&self) -> Result<(),SetupError> {

		info!("Installing ThunderSTORM plugin ...");

		fs::create_dir_all(&self.plugins_dir)
			.map_err(|source| SetupError::CreateDir {
				path: self.plugins_dir.clone(),
				source
			})?;

		let asset = self.plugin_release()?;

		let existing = self.installed_plugins();
		if let Some(first) = existing.first() {
			info!("ThunderSTORM plugin already exists: {}", first.to_string_lossy());
			if !self.resolve_conflict(first)? {
				return Ok(());
			}
			for jar in &existing {
				fs::remove_file(jar)
					.map_err(|source| SetupError::RemoveExisting {
						path: jar.clone(),
						source
					})?;
			}
		}

		// the name came off the network, so keep only the file name part
		let jar_name = Path::new(&asset.name)
			.file_name()
			.map(|n| n.to_os_string())
			.ok_or_else(|| SetupError::ReleaseLookup(format!("bad asset name: {}", asset.name)))?;
		let jar_path = self.plugins_dir.join(jar_name);

		if !download::download(&asset.download_url, &jar_path, "ThunderSTORM plugin") {
			return Err(SetupError::Download {
				what: "ThunderSTORM plugin".to_string(),
				url: asset.download_url
			});
		}

		info!("ThunderSTORM plugin installed at {}", jar_path.to_string_lossy());
		Ok(())
	}

	pub fn verify_installation(&self) -> Result<(),SetupError> {

		info!("Verifying installation ...");

		if !self.app_dir.is_dir() {
			return Err(SetupError::Verification(format!("Fiji folder not found: {}", self.app_dir.to_string_lossy())));
		}

		let exe = self.executable();
		if !exe.exists() {
			return Err(SetupError::Verification(format!("Fiji executable not found: {}", exe.to_string_lossy())));
		}
		info!("Fiji executable found at {}", exe.to_string_lossy());

		let plugins = self.installed_plugins();
		let Some(plugin) = plugins.first()
			else { return Err(SetupError::Verification("ThunderSTORM plugin not found".to_string())); };
		info!("ThunderSTORM plugin found: {}", plugin.to_string_lossy());

		if !fiji::smoke_test(&exe, self.config.smoke_test_timeout()) {
			return Err(SetupError::Verification("Fiji failed to run a test macro".to_string()));
		}

		Ok(())
	}

	/// Returns true if the existing files should be replaced, false if they should be kept.
	fn resolve_conflict(&self, existing: &Path) -> Result<bool,SetupError> {
		match self.on_conflict {
			OnConflict::Overwrite => Ok(true),
			OnConflict::Keep => {
				info!("Keeping existing installation");
				Ok(false)
			}
			OnConflict::Abort => Err(SetupError::Aborted(existing.to_path_buf())),
			OnConflict::Prompt => Ok(confirm("Do you want to reinstall? (y/N): "))
		}
	}
}


/// Asks a yes/no question on the terminal. Anything but yes, including no terminal at all, is no.
fn confirm(question: &str) -> bool {

	print!("{}", question);
	io::stdout().flush().ok();

	let mut answer = String::new();
	match io::stdin().lock().read_line(&mut answer) {
		Ok(0) | Err(_) => false,
		Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
	}
}


/// Names the staged archive after the last URL segment, so extraction sees the real extension.
fn archive_name(url: &str, platform: Platform) -> String {
	url.rsplit('/')
		.next()
		.map(|segment| segment.split(['?', '#']).next().unwrap_or(""))
		.filter(|name| !name.is_empty())
		.map(String::from)
		.unwrap_or_else(|| {
			warn!("Can't tell the archive name from {}, assuming zip", url);
			format!("fiji-{}.zip", platform)
		})
}
