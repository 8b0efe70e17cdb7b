
use std::path::PathBuf;

use anyhow::{bail, Result};
use gumdrop::Options;
use tracing::info;

use crate::automator::Automator;
use crate::config::Config;


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// path to the Fiji executable, instead of searching the usual places
	#[options(parse(try_from_str))]
	fiji: Option<PathBuf>
}


pub fn run(config: &Config, args: Args) -> Result<()> {

	let automator = Automator::new(config, args.fiji)?;

	if !automator.test_installation() {
		bail!("Fiji at {} failed to run a test macro", automator.executable().to_string_lossy());
	}

	info!("Fiji is ready: {}", automator.executable().to_string_lossy());
	Ok(())
}
