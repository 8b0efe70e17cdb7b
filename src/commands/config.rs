
use std::path::PathBuf;

use anyhow::Result;
use gumdrop::Options;

use crate::config::Config;


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// also write the effective configuration to this file
	#[options(parse(try_from_str))]
	save: Option<PathBuf>
}


pub fn run(config: &Config, args: Args) -> Result<()> {

	println!("Platform: {}", config.platform());
	match config.path() {
		Some(path) => println!("Overrides: {}", path.to_string_lossy()),
		None => println!("Overrides: (none)")
	}
	println!("{}", config.to_pretty_string()?);

	if let Some(path) = &args.save {
		config.save(path)?;
	}

	Ok(())
}
