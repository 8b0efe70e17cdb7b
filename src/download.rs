
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde_json::Value;
use tracing::{info, warn};

use crate::VERSION;


const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 64*1024;


/// Downloads the URL to the destination path, logging progress along the way.
/// Supports http(s) URLs, and file URLs for local mirrors.
/// Failures are logged and reported as false.
pub fn download(url: &str, dest: impl AsRef<Path>, description: &str) -> bool {

	let dest = dest.as_ref();
	info!("Downloading {} from {}", description, url);

	match download_to(url, dest, description) {
		Ok(bytes) => {
			info!("Downloaded {} successfully ({} bytes)", description, bytes);
			true
		}
		Err(e) => {
			warn!("Failed to download {}: {:#}", description, e);
			// don't leave half a file lying around
			if dest.exists() {
				fs::remove_file(dest).ok();
			}
			false
		}
	}
}


/// Fetches and parses a JSON document, eg a release listing.
pub fn fetch_json(url: &str) -> Result<Value> {
	match Source::parse(url)? {

		Source::File(path) => {
			let json = fs::read_to_string(&path)
				.context(format!("Failed to read {}", path.to_string_lossy()))?;
			serde_json::from_str(&json)
				.context(format!("Response from {} was not valid JSON", url))
		}

		Source::Http(url) => {
			client()?
				.get(url.clone())
				.header(reqwest::header::ACCEPT, "application/json")
				.send()
				.context(format!("Failed to send request to {}", url))?
				.error_for_status()
				.context(format!("Request to {} failed", url))?
				.json::<Value>()
				.context(format!("Response from {} was not valid JSON", url))
		}
	}
}


enum Source {
	File(PathBuf),
	Http(Url)
}

impl Source {

	fn parse(url: &str) -> Result<Self> {
		let parsed = Url::parse(url)
			.context(format!("Invalid URL: {}", url))?;
		match parsed.scheme() {

			"file" => {
				let path = parsed.to_file_path()
					.map_err(|_| anyhow::anyhow!("Invalid file URL: {}", url))?;
				Ok(Source::File(path))
			}

			"http" | "https" => Ok(Source::Http(parsed)),

			other => bail!("Unrecognized URL scheme: {}", other)
		}
	}
}


fn client() -> Result<reqwest::blocking::Client> {
	reqwest::blocking::Client::builder()
		// GitHub rejects API requests without a user agent
		.user_agent(format!("thunderstorm-automator/{}", VERSION))
		.connect_timeout(CONNECT_TIMEOUT)
		// big archives take a while, so no overall timeout
		.timeout(None)
		.build()
		.context("Failed to build HTTP client")
}


fn download_to(url: &str, dest: &Path, description: &str) -> Result<u64> {

	let mut out = File::create(dest)
		.context(format!("Failed to create {}", dest.to_string_lossy()))?;

	let bytes = match Source::parse(url)? {

		Source::File(path) => {
			let mut file = File::open(&path)
				.context(format!("Failed to open {}", path.to_string_lossy()))?;
			let total = file.metadata()
				.map(|m| m.len())
				.ok();
			copy_with_progress(&mut file, &mut out, total, description)?
		}

		Source::Http(url) => {
			let mut response = client()?
				.get(url.clone())
				.send()
				.context(format!("Failed to send request to {}", url))?
				.error_for_status()
				.context(format!("Request to {} failed", url))?;
			let total = response.content_length();
			copy_with_progress(&mut response, &mut out, total, description)?
		}
	};

	out.flush()
		.context(format!("Failed to write {}", dest.to_string_lossy()))?;

	Ok(bytes)
}


/// Copies the stream in chunks, logging each 10% of progress when the total size is known.
fn copy_with_progress(reader: &mut impl Read, writer: &mut impl Write, total: Option<u64>, description: &str) -> Result<u64> {

	let mut buf = vec![0u8; CHUNK_SIZE];
	let mut done = 0u64;
	let mut last_reported = 0u64;

	loop {
		let n = reader.read(&mut buf)
			.context("Failed to read download stream")?;
		if n == 0 {
			break;
		}
		writer.write_all(&buf[..n])
			.context("Failed to write downloaded data")?;
		done += n as u64;

		if let Some(total) = total.filter(|t| *t > 0) {
			let percent = (done*100/total).min(100);
			if percent >= last_reported + 10 || (percent == 100 && last_reported < 100) {
				info!("{}: {}%", description, percent);
				last_reported = percent - percent%10;
			}
		}
	}

	Ok(done)
}
