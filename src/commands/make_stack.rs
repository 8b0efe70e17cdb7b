
use std::path::PathBuf;

use anyhow::{bail, Result};
use gumdrop::Options;
use tracing::info;

use crate::image;


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// frame width in pixels
	#[options(default = "64")]
	width: u32,

	/// frame height in pixels
	#[options(no_short, default = "64")]
	height: u32,

	/// number of frames
	#[options(default = "20")]
	frames: usize,

	/// where to write the stack
	#[options(free, required, parse(try_from_str))]
	path: PathBuf
}


pub fn run(args: Args) -> Result<()> {

	if args.width == 0 || args.height == 0 || args.frames == 0 {
		bail!("The stack needs at least one frame of at least 1x1 pixels");
	}

	image::write_test_stack(&args.path, args.width, args.height, args.frames)?;
	info!("Wrote {}x{} stack of {} frames to: {}", args.width, args.height, args.frames, args.path.to_string_lossy());

	Ok(())
}
