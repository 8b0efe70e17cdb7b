
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::logging::ResultExt;
use crate::platform::Platform;


const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SMOKE_TEST_TIMEOUT_SECS: u64 = 30;


/// Config is the merged view of the built-in defaults and an optional JSON override file.
/// Values are addressed with dotted keys, eg `fiji.urls.linux`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	platform: Platform,
	values: Map<String,Value>,
	path: Option<PathBuf>
}

impl Config {

	/// just the built-in defaults for the given platform
	pub fn for_platform(platform: Platform) -> Self {
		Self {
			platform,
			values: defaults(),
			path: None
		}
	}

	/// Loads the defaults, then merges the override file on top, if any.
	/// Problems with the override file are logged, but the defaults always survive.
	pub fn load(platform: Platform, path: Option<&Path>) -> Self {

		let mut config = Self::for_platform(platform);

		if let Some(path) = path {
			config.path = Some(path.to_path_buf());
			if let Ok(overrides) = read_overrides(path).warn_err() {
				config.merge(overrides);
				info!("Loaded configuration overrides from: {}", path.to_string_lossy());
			}
		}

		config
	}

	pub fn platform(&self) -> Platform {
		self.platform
	}

	/// the override file this config was loaded from, if any
	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	pub fn values(&self) -> &Map<String,Value> {
		&self.values
	}

	pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
		let mut parts = key.as_ref().split('.');
		let first = parts.next()?;
		let mut value = self.values.get(first)?;
		for part in parts {
			value = value.as_object()?
				.get(part)?;
		}
		Some(value)
	}

	pub fn get_or<'a>(&'a self, key: impl AsRef<str>, default: &'a Value) -> &'a Value {
		self.get(key)
			.unwrap_or(default)
	}

	pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
		self.get(key)
			.and_then(Value::as_str)
	}

	/// Sets a value, creating any missing intermediate objects along the way.
	/// Intermediate values that aren't objects get replaced by objects.
	pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<Value>) {

		let key = key.as_ref();
		let mut parts = key.split('.').collect::<Vec<_>>();
		let Some(last) = parts.pop()
			else { return; };

		let mut map = &mut self.values;
		for part in parts {
			let entry = map.entry(part.to_string())
				.or_insert_with(|| Value::Object(Map::new()));
			if !entry.is_object() {
				debug!("Replacing non-object value at {} while setting {}", part, key);
				*entry = Value::Object(Map::new());
			}
			map = match entry {
				Value::Object(next) => next,
				_ => unreachable!("entry was just made an object")
			};
		}

		map.insert(last.to_string(), value.into());
	}

	/// Recursively merges overrides into this config.
	/// Scalars and arrays replace the existing value outright, objects merge key by key.
	/// A scalar never replaces an existing object though: that would drop default keys.
	pub fn merge(&mut self, overrides: Map<String,Value>) {
		merge_into(&mut self.values, overrides, "");
	}

	pub fn to_pretty_string(&self) -> Result<String> {
		serde_json::to_string_pretty(&self.values)
			.context("Failed to serialize configuration")
	}

	pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		let json = self.to_pretty_string()?;
		fs::write(path, json)
			.context(format!("Failed to write configuration to: {}", path.to_string_lossy()))?;
		info!("Configuration saved to: {}", path.to_string_lossy());
		Ok(())
	}


	pub fn fiji_url(&self) -> Option<&str> {
		self.get_str(format!("fiji.urls.{}", self.platform))
	}

	/// the conventional executable locations for this platform, in probing order
	pub fn fiji_install_paths(&self) -> Vec<PathBuf> {
		self.get(format!("fiji.install_paths.{}", self.platform))
			.and_then(Value::as_array)
			.map(|paths| {
				paths.iter()
					.filter_map(Value::as_str)
					.map(PathBuf::from)
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn default_install_dir(&self) -> PathBuf {
		self.get_str(format!("fiji.default_install_dirs.{}", self.platform))
			.map(PathBuf::from)
			.unwrap_or_else(home_dir)
	}

	pub fn plugin_api_url(&self) -> Option<&str> {
		self.get_str("thunderstorm.github_api_url")
	}

	pub fn plugin_asset_extension(&self) -> &str {
		self.get_str("thunderstorm.asset_extension")
			.unwrap_or(".jar")
	}

	pub fn plugin_asset_filter(&self) -> &str {
		self.get_str("thunderstorm.asset_filter")
			.unwrap_or("thunderstorm")
	}

	pub fn default_parameters(&self) -> Map<String,Value> {
		self.get("thunderstorm.default_parameters")
			.and_then(Value::as_object)
			.cloned()
			.unwrap_or_default()
	}

	pub fn analysis_timeout(&self) -> Duration {
		self.duration_secs("analysis.timeout", DEFAULT_ANALYSIS_TIMEOUT_SECS)
	}

	pub fn smoke_test_timeout(&self) -> Duration {
		self.duration_secs("setup.smoke_test_timeout", DEFAULT_SMOKE_TEST_TIMEOUT_SECS)
	}

	/// Positive seconds from the config, or the default for anything unusable.
	fn duration_secs(&self, key: &str, default: u64) -> Duration {
		let Some(value) = self.get(key)
			else { return Duration::from_secs(default); };
		let duration = value.as_f64()
			.filter(|secs| *secs > 0.0)
			.and_then(|secs| Duration::try_from_secs_f64(secs).ok());
		match duration {
			Some(duration) => duration,
			None => {
				warn!("Ignoring config value {}={}: not a usable number of seconds, using {} s", key, value, default);
				Duration::from_secs(default)
			}
		}
	}
}


fn read_overrides(path: &Path) -> Result<Map<String,Value>> {

	let json = fs::read_to_string(path)
		.context(format!("Could not load config file {}", path.to_string_lossy()))?;
	let value = serde_json::from_str::<Value>(&json)
		.context(format!("Could not parse config file {}", path.to_string_lossy()))?;

	match value {
		Value::Object(map) => Ok(map),
		other => bail!("Config file {} must hold a JSON object, not: {}", path.to_string_lossy(), other)
	}
}


fn merge_into(base: &mut Map<String,Value>, overrides: Map<String,Value>, prefix: &str) {
	for (key, value) in overrides {

		let path =
			if prefix.is_empty() {
				key.clone()
			} else {
				format!("{}.{}", prefix, key)
			};

		match base.get_mut(&key) {

			Some(Value::Object(existing)) => match value {
				Value::Object(update) => merge_into(existing, update, &path),
				other => warn!("Ignoring config override {}={}: it would replace a whole section", path, other)
			},

			_ => {
				base.insert(key, value);
			}
		}
	}
}


fn home_dir() -> PathBuf {
	directories::BaseDirs::new()
		.map(|dirs| dirs.home_dir().to_path_buf())
		.unwrap_or_else(|| PathBuf::from("."))
}


fn home_path(parts: &[&str]) -> String {
	let mut path = home_dir();
	for part in parts {
		path.push(part);
	}
	path.to_string_lossy().to_string()
}


fn defaults() -> Map<String,Value> {

	let program_files = std::env::var("PROGRAMFILES")
		.unwrap_or_else(|_| r"C:\Program Files".to_string());

	let defaults = json!({
		"fiji": {
			"urls": {
				"windows": "https://downloads.imagej.net/fiji/latest/fiji-win64.zip",
				"darwin": "https://downloads.imagej.net/fiji/latest/fiji-macosx.zip",
				"linux": "https://downloads.imagej.net/fiji/latest/fiji-linux64.zip"
			},
			"install_paths": {
				"windows": [
					r"C:\Program Files\Fiji.app\ImageJ-win64.exe",
					r"C:\Program Files (x86)\Fiji.app\ImageJ-win64.exe",
					home_path(&["Fiji.app", "ImageJ-win64.exe"]),
					home_path(&["Desktop", "Fiji.app", "ImageJ-win64.exe"])
				],
				"darwin": [
					"/Applications/Fiji.app/Contents/MacOS/ImageJ-macosx",
					"/Applications/Fiji.app/Contents/MacOS/ImageJ-macosx64",
					home_path(&["Applications", "Fiji.app", "Contents", "MacOS", "ImageJ-macosx"])
				],
				"linux": [
					home_path(&["Fiji.app", "ImageJ-linux64"]),
					"/opt/Fiji.app/ImageJ-linux64"
				]
			},
			"default_install_dirs": {
				"windows": program_files,
				"darwin": "/Applications",
				"linux": home_dir().to_string_lossy()
			}
		},
		"thunderstorm": {
			"github_api_url": "https://api.github.com/repos/zitmen/thunderstorm/releases/latest",
			"asset_extension": ".jar",
			"asset_filter": "thunderstorm",
			"default_parameters": {
				"pixel_size": 100.0,
				"gain": 100.0,
				"offset": 100.0,
				"processing_method": "Wavelet filter (B-Spline)",
				"localization_method": "PSF: Integrated Gaussian",
				"sigma": 1.6,
				"fitting_radius": 3,
				"create_reconstructed_image": true
			}
		},
		"analysis": {
			"timeout": DEFAULT_ANALYSIS_TIMEOUT_SECS
		},
		"setup": {
			"on_conflict": "prompt",
			"smoke_test_timeout": DEFAULT_SMOKE_TEST_TIMEOUT_SECS
		}
	});

	match defaults {
		Value::Object(map) => map,
		_ => Map::new()
	}
}
