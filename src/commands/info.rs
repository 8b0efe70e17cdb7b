
use std::path::PathBuf;

use anyhow::{bail, Result};
use gumdrop::Options;

use crate::image;


#[derive(Options)]
pub struct Args {

	#[options(help_flag)]
	help: bool,

	/// the image file to describe
	#[options(free, required, parse(try_from_str))]
	path: PathBuf
}


pub fn run(args: Args) -> Result<()> {

	let info = image::image_info(&args.path);
	if !info.exists {
		bail!("File not found: {}", args.path.to_string_lossy());
	}

	println!("Path:       {}", info.path.to_string_lossy());
	println!("Size:       {} bytes", info.size_bytes);
	println!("Valid TIFF: {}", info.valid_tiff);
	if let Some(details) = &info.details {
		println!("Dimensions: {}x{}", details.width, details.height);
		println!("Frames:     {}", details.frames);
		println!("Color type: {}", details.color_type);
	}
	if let Some(error) = &info.error {
		println!("Unreadable: {}", error);
	}

	Ok(())
}
