
use std::fmt;
use std::str::FromStr;

use anyhow::bail;


/// The host operating systems Fiji ships builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
	Windows,
	Darwin,
	Linux
}

impl Platform {

	/// Detects the platform from the compile target.
	/// Unix flavors other than macOS use the Linux layout.
	pub fn current() -> Self {
		if cfg!(target_os = "windows") {
			Platform::Windows
		} else if cfg!(target_os = "macos") {
			Platform::Darwin
		} else {
			Platform::Linux
		}
	}

	/// the key segment used for per-platform configuration values
	pub fn key(&self) -> &'static str {
		match self {
			Platform::Windows => "windows",
			Platform::Darwin => "darwin",
			Platform::Linux => "linux"
		}
	}

	pub fn is_unix(&self) -> bool {
		!matches!(self, Platform::Windows)
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

impl FromStr for Platform {

	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self,Self::Err> {
		match s.to_lowercase().as_str() {
			"windows" => Ok(Platform::Windows),
			"darwin" | "macos" => Ok(Platform::Darwin),
			"linux" => Ok(Platform::Linux),
			other => bail!("Unrecognized platform: {}", other)
		}
	}
}
