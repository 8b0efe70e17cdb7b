
use std::path::PathBuf;

use anyhow::{Context, Result};
use gumdrop::Options;
use indoc::formatdoc;

use crate::config::Config;
use crate::installer::{Installer, OnConflict};


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// what to do about an existing installation: prompt, overwrite, keep, abort
	#[options(parse(try_from_str))]
	on_conflict: Option<OnConflict>,

	/// the folder to install into, defaults to the platform's usual place
	#[options(free, parse(try_from_str))]
	dir: Option<PathBuf>
}


pub fn run(config: &Config, args: Args) -> Result<()> {

	let mut installer = Installer::new(config, args.dir);
	if let Some(on_conflict) = args.on_conflict {
		installer = installer.with_on_conflict(on_conflict);
	}

	installer.setup_all()
		.context("Setup failed")?;

	println!("{}", formatdoc! { r#"

		Setup complete!

		Fiji executable:
			{exe}

		Try an analysis with:
			thunderstorm-automator analyze --fiji "{exe}" <input.tif> <output folder>
	"#,
		exe = installer.executable().to_string_lossy()
	});

	Ok(())
}
