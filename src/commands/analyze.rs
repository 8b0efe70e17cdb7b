
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use gumdrop::Options;
use tracing::{info, warn};

use crate::automator::{AnalysisOutcome, Automator};
use crate::config::Config;
use crate::error::AutomatorError;
use crate::installer::Installer;
use crate::params::{self, ParamOverride};


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// path to the Fiji executable, instead of searching the usual places
	#[options(parse(try_from_str))]
	fiji: Option<PathBuf>,

	/// analysis parameter override as KEY=VALUE, eg pixel_size=65.0, can be repeated
	#[options(multi = "push", meta = "KEY=VALUE")]
	param: Vec<ParamOverride>,

	/// seconds to wait for Fiji before giving up
	timeout: Option<u64>,

	/// if Fiji can't be found, install it into the default folder first
	#[options(no_short)]
	install: bool,

	/// the TIFF stack to analyze
	#[options(free, required, parse(try_from_str))]
	input: PathBuf,

	/// the folder for the results
	#[options(free, required, parse(try_from_str))]
	output: PathBuf
}


pub fn run(config: &Config, args: Args) -> Result<()> {

	let automator = match Automator::new(config, args.fiji.clone()) {
		Ok(automator) => automator,
		Err(AutomatorError::ExecutableNotFound { .. }) if args.install && args.fiji.is_none() => {
			warn!("Fiji not found, installing it first");
			let installer = Installer::new(config, None);
			installer.setup_all()
				.context("Failed to install Fiji")?;
			Automator::new(config, Some(installer.executable()))?
		}
		Err(e) => return Err(e.into())
	};

	let automator = match args.timeout {
		Some(secs) => automator.with_timeout(Duration::from_secs(secs)),
		None => automator
	};

	if !automator.validate_input(&args.input) {
		warn!("Input didn't pass validation, trying the analysis anyway");
	}

	let overrides = params::overrides_map(args.param);
	let outcome = automator.run_analysis(&args.input, &args.output, &overrides)?;

	report(&outcome);

	if !outcome.success {
		bail!("Analysis failed: Fiji exited with code {}", outcome.process.code);
	}

	Ok(())
}


fn report(outcome: &AnalysisOutcome) {

	info!("Macro: {}", outcome.macro_path.to_string_lossy());

	let Some(artifacts) = &outcome.artifacts
		else { return; };

	match (artifacts.results.present, artifacts.results.rows) {
		(true, Some(rows)) => info!("Results: {} ({} localizations)", artifacts.results.path.to_string_lossy(), rows),
		(true, None) => info!("Results: {}", artifacts.results.path.to_string_lossy()),
		(false, _) => warn!("Results: missing")
	}

	if let Some(reconstruction) = &artifacts.reconstruction {
		if reconstruction.present {
			info!("Reconstruction: {}", reconstruction.path.to_string_lossy());
		} else {
			warn!("Reconstruction: missing");
		}
	}
}
