
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AutomatorError;
use crate::fiji;
use crate::files;
use crate::image;
use crate::params::{self, AnalysisParams};
use crate::process::{ProcessResult, FAILURE_CODE};
use crate::script::{RunOptions, Script, Statement};


pub const RESULTS_FILE: &'static str = "results.csv";
pub const RECONSTRUCTION_FILE: &'static str = "reconstructed_image.tif";
pub const MACRO_FILE: &'static str = "thunderstorm_macro.ijm";

/// the reconstruction window gets one of these in its title
const RECONSTRUCTION_MARKERS: [&'static str; 2] = ["Reconstructed", "Visualization"];

const MIN_INPUT_SIZE: u32 = 10;


/// Runs ThunderSTORM analyses through an existing Fiji installation.
pub struct Automator<'c> {
	config: &'c Config,
	executable: PathBuf,
	timeout: Duration
}

impl<'c> Automator<'c> {

	/// Uses the explicit executable if given, otherwise the first conventional location that exists.
	pub fn new(config: &'c Config, executable: Option<PathBuf>) -> Result<Self,AutomatorError> {

		let executable = match executable {
			Some(path) => {
				if !path.exists() {
					return Err(AutomatorError::ExecutableNotFound {
						path: Some(path),
						searched: vec![]
					});
				}
				path
			}
			None => Self::find_executable(config)
				.ok_or_else(|| AutomatorError::ExecutableNotFound {
					path: None,
					searched: config.fiji_install_paths()
				})?
		};

		info!("Fiji executable found at: {}", executable.to_string_lossy());

		Ok(Self {
			config,
			executable,
			timeout: config.analysis_timeout()
		})
	}

	pub fn find_executable(config: &Config) -> Option<PathBuf> {
		config.fiji_install_paths()
			.into_iter()
			.find(|path| path.exists())
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn executable(&self) -> &Path {
		&self.executable
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Checks Fiji can run a trivial macro.
	pub fn test_installation(&self) -> bool {
		fiji::smoke_test(&self.executable, self.config.smoke_test_timeout())
	}

	/// A stricter check than the one run_analysis does: the input must be a non-empty TIFF
	/// at least 10x10 pixels, when the dimensions can be read.
	pub fn validate_input(&self, path: impl AsRef<Path>) -> bool {

		let path = path.as_ref();
		let info = image::image_info(path);

		if !info.exists {
			warn!("Input file does not exist: {}", path.to_string_lossy());
			return false;
		}
		if !info.valid_tiff {
			warn!("Input file is not a valid TIFF: {}", path.to_string_lossy());
			return false;
		}
		if info.size_bytes == 0 {
			warn!("Input file is empty: {}", path.to_string_lossy());
			return false;
		}
		if let Some(details) = &info.details {
			if details.width < MIN_INPUT_SIZE || details.height < MIN_INPUT_SIZE {
				warn!("Input image is too small: {}x{}", details.width, details.height);
				return false;
			}
			info!("Image size: {}x{} pixels, {} frames", details.width, details.height, details.frames);
		}

		info!("Input file validation passed: {}", path.to_string_lossy());
		true
	}

	/// Analyzes the input stack into the output folder.
	/// The outcome's success comes from Fiji's exit code alone: missing output files are only reported.
	pub fn run_analysis(&self, input_path: impl AsRef<Path>, output_dir: impl AsRef<Path>, overrides: &Map<String,Value>) -> Result<AnalysisOutcome,AutomatorError> {

		let input_path = input_path.as_ref();
		let output_dir = output_dir.as_ref();

		let mut params = AnalysisParams::from_config(self.config);
		params.apply(overrides);

		if !input_path.exists() {
			return Err(AutomatorError::InputNotFound(input_path.to_path_buf()));
		}

		// some valid stacks have unusual headers, so let Fiji have a go anyway
		if !image::validate_tiff(input_path) {
			warn!("{} may not be a valid TIFF file", input_path.to_string_lossy());
		}

		let output_dir_arg = files::sanitize_path(output_dir);
		if !option_safe(&output_dir_arg) {
			return Err(AutomatorError::UnrepresentablePath(output_dir.to_path_buf()));
		}

		fs::create_dir_all(output_dir)
			.map_err(|source| AutomatorError::OutputDir {
				path: output_dir.to_path_buf(),
				source
			})?;

		let script = analysis_script(
			&files::sanitize_path(input_path),
			&output_dir_arg,
			&params
		);

		let macro_path = output_dir.join(MACRO_FILE);
		script.write(&macro_path)
			.map_err(|source| AutomatorError::WriteMacro {
				path: macro_path.clone(),
				source
			})?;
		info!("Generated macro saved to: {}", macro_path.to_string_lossy());

		info!("Running ThunderSTORM analysis via Fiji ...");
		let process = fiji::run_macro(&self.executable, &macro_path, self.timeout);

		let success = process.success();
		let artifacts =
			if success {
				log_output(&process);
				info!("Analysis complete! Results saved in: {}", output_dir.to_string_lossy());
				Some(inspect_outputs(output_dir, &params))
			} else if process.code == FAILURE_CODE {
				warn!("Fiji process timed out or failed to run: {}", process.stderr.trim());
				None
			} else {
				warn!("Fiji exited with code {}", process.code);
				log_output(&process);
				warn!("Check that the ThunderSTORM plugin is installed, the input is a valid TIFF stack, and Fiji can run headless");
				None
			};

		Ok(AnalysisOutcome {
			success,
			process,
			macro_path,
			params,
			artifacts
		})
	}
}


/// Whether a path survives as a run() option value unchanged.
pub fn option_safe(path: &str) -> bool {
	!path.contains(['[', ']'])
}


fn log_output(process: &ProcessResult) {
	if !process.stdout.trim().is_empty() {
		info!("Fiji stdout:\n{}", process.stdout.trim_end());
	}
	if !process.stderr.trim().is_empty() {
		info!("Fiji stderr:\n{}", process.stderr.trim_end());
	}
}


#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
	/// Fiji exited with code 0, whatever files it did or didn't write
	pub success: bool,
	pub process: ProcessResult,
	pub macro_path: PathBuf,
	pub params: AnalysisParams,
	/// only inspected when Fiji succeeded
	pub artifacts: Option<ArtifactReport>
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
	pub results: Artifact,
	/// only present when a reconstruction was requested
	pub reconstruction: Option<Artifact>,
	pub macro_file: Artifact
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
	pub path: PathBuf,
	pub present: bool,
	/// number of data rows below the header, for the results table
	pub rows: Option<usize>
}

impl Artifact {

	fn probe(path: PathBuf) -> Self {
		Self {
			present: path.is_file(),
			path,
			rows: None
		}
	}
}


/// Checks which of the expected output files are there, logging what's missing.
pub fn inspect_outputs(output_dir: &Path, params: &AnalysisParams) -> ArtifactReport {

	let mut results = Artifact::probe(output_dir.join(RESULTS_FILE));
	if results.present {
		info!("Localization results: {}", results.path.to_string_lossy());
		match fs::read_to_string(&results.path) {
			Ok(csv) => {
				let rows = csv.lines().count().saturating_sub(1);
				if rows > 0 {
					info!("\tFound {} localizations", rows);
				} else {
					warn!("\tNo localizations found in results");
				}
				results.rows = Some(rows);
			}
			Err(e) => warn!("\tCould not read results file: {}", e)
		}
	} else {
		warn!("Expected {} file not found", RESULTS_FILE);
	}

	let reconstruction =
		if params.create_reconstructed_image() {
			let artifact = Artifact::probe(output_dir.join(RECONSTRUCTION_FILE));
			if artifact.present {
				info!("Super-resolved image: {}", artifact.path.to_string_lossy());
				if let Some(details) = image::image_info(&artifact.path).details {
					info!("\tImage size: {}x{} pixels", details.width, details.height);
				}
			} else {
				warn!("Expected {} file not found", RECONSTRUCTION_FILE);
			}
			Some(artifact)
		} else {
			None
		};

	let macro_file = Artifact::probe(output_dir.join(MACRO_FILE));
	if macro_file.present {
		info!("Macro file retained for debugging: {}", macro_file.path.to_string_lossy());
	}

	ArtifactReport {
		results,
		reconstruction,
		macro_file
	}
}


/// Builds the analysis macro from already-sanitized paths.
pub fn analysis_script(input_path: &str, output_dir: &str, params: &AnalysisParams) -> Script {

	let results_path = format!("{}/{}", output_dir, RESULTS_FILE);

	let mut script = Script::new();
	script
		.push(Statement::comment("ThunderSTORM analysis macro"))
		.push(Statement::print("Starting ThunderSTORM analysis..."))
		.push(Statement::Blank)
		.push(Statement::Open(input_path.to_string()))
		.push(Statement::print(format!("Opened input file: {}", input_path)))
		.push(Statement::RequireImages)
		.push(Statement::Blank)
		.push(Statement::run("Run analysis", RunOptions::new()
			.arg("filter", params.get(params::PROCESSING_METHOD))
			.arg("detector", "Local maximum")
			.arg("estimator", params.get(params::LOCALIZATION_METHOD))
			.arg("sigma", params.get(params::SIGMA))
			.arg("fitradius", params.get(params::FITTING_RADIUS))
			.arg("method", "Weighted Least squares")
			.arg("camera.gain", params.get(params::GAIN))
			.arg("camera.offset", params.get(params::OFFSET))
			.arg("camera.pixelsize", params.get(params::PIXEL_SIZE))
		))
		.push(Statement::print("ThunderSTORM analysis completed."))
		.push(Statement::Blank)
		.push(Statement::run("Export results", RunOptions::new()
			.arg("filepath", results_path.as_str())
			.arg("fileformat", "CSV (comma separated)")
			.arg("x", true)
			.arg("y", true)
			.arg("sigma", true)
			.arg("intensity", true)
			.arg("offset", true)
			.arg("bkgstd", true)
			.arg("uncertainty", true)
			.arg("saveprotocol", true)
		))
		.push(Statement::print(format!("Results exported to: {}", results_path)));

	if params.create_reconstructed_image() {
		script
			.push(Statement::Blank)
			.push(Statement::run("Visualization", RunOptions::new()
				.arg("imleft", 0.0)
				.arg("imtop", 0.0)
				.arg("imwidth", 512.0)
				.arg("imheight", 512.0)
				.arg("renderer", "Averaged shifted histograms")
				.arg("magnification", 5.0)
				.arg("colorizez", false)
				.arg("threed", false)
				.arg("shifts", 2)
				.arg("repaint", 50)
			))
			.push(Statement::SaveFirstTitled {
				markers: RECONSTRUCTION_MARKERS.iter().map(|m| m.to_string()).collect(),
				format: "Tiff".to_string(),
				path: format!("{}/{}", output_dir, RECONSTRUCTION_FILE)
			});
	}

	script
		.push(Statement::Blank)
		.push(Statement::comment("close all windows so Fiji can exit cleanly"))
		.push(Statement::CloseAll)
		.push(Statement::print("Analysis complete. All windows closed."));

	script
}
