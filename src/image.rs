
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tiff::decoder::Decoder;
use tiff::encoder::{colortype, TiffEncoder};
use tracing::debug;


pub const TIFF_MAGIC_LE: [u8; 4] = *b"II*\0";
pub const TIFF_MAGIC_BE: [u8; 4] = *b"MM\0*";


pub fn has_tiff_extension(path: impl AsRef<Path>) -> bool {
	path.as_ref()
		.extension()
		.map(|ext| {
			let ext = ext.to_string_lossy().to_lowercase();
			ext == "tif" || ext == "tiff"
		})
		.unwrap_or(false)
}


/// A file is a TIFF if it has a TIFF extension and starts with one of the TIFF byte-order headers.
pub fn validate_tiff(path: impl AsRef<Path>) -> bool {

	let path = path.as_ref();
	if !path.is_file() || !has_tiff_extension(path) {
		return false;
	}

	let mut magic = [0u8; 4];
	let read = File::open(path)
		.and_then(|mut f| f.read_exact(&mut magic));
	match read {
		Ok(()) => magic == TIFF_MAGIC_LE || magic == TIFF_MAGIC_BE,
		Err(e) => {
			debug!("Failed to read header of {}: {}", path.to_string_lossy(), e);
			false
		}
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
	pub path: PathBuf,
	pub exists: bool,
	pub size_bytes: u64,
	pub valid_tiff: bool,
	pub details: Option<TiffDetails>,
	/// why the details couldn't be read, if they couldn't
	pub error: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffDetails {
	pub width: u32,
	pub height: u32,
	pub frames: usize,
	pub color_type: String
}


pub fn image_info(path: impl AsRef<Path>) -> ImageInfo {

	let path = path.as_ref();
	let metadata = fs::metadata(path).ok();

	let mut info = ImageInfo {
		path: path.to_path_buf(),
		exists: metadata.is_some(),
		size_bytes: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
		valid_tiff: false,
		details: None,
		error: None
	};
	if !info.exists {
		return info;
	}

	info.valid_tiff = validate_tiff(path);
	match read_details(path) {
		Ok(details) => info.details = Some(details),
		Err(e) => info.error = Some(format!("{:#}", e))
	}

	info
}


fn read_details(path: &Path) -> Result<TiffDetails> {

	let file = File::open(path)
		.context(format!("Failed to open {}", path.to_string_lossy()))?;
	let mut decoder = Decoder::new(BufReader::new(file))
		.context("Failed to decode TIFF")?;

	let (width, height) = decoder.dimensions()
		.context("Failed to read TIFF dimensions")?;
	let color_type = decoder.colortype()
		.context("Failed to read TIFF color type")?;

	// walk the image directories to count the frames
	let mut frames = 1;
	while decoder.more_images() {
		decoder.next_image()
			.context(format!("Failed to read TIFF frame {}", frames + 1))?;
		frames += 1;
	}

	Ok(TiffDetails {
		width,
		height,
		frames,
		color_type: format!("{:?}", color_type)
	})
}


/// Writes a multi-page 8-bit TIFF stack of random noise, handy for trying out the pipeline.
pub fn write_test_stack(path: impl AsRef<Path>, width: u32, height: u32, frames: usize) -> Result<()> {

	let path = path.as_ref();

	let Some(pixel_count) = width.checked_mul(height)
		.and_then(|count| usize::try_from(count).ok())
		else { bail!("Stack frames of {}x{} pixels are too big", width, height); };

	let file = File::create(path)
		.context(format!("Failed to create {}", path.to_string_lossy()))?;
	let mut encoder = TiffEncoder::new(BufWriter::new(file))
		.context("Failed to start TIFF encoder")?;

	let mut rng = fastrand::Rng::with_seed(12345);
	let mut pixels = vec![0u8; pixel_count];
	for frame in 0 .. frames {
		rng.fill(&mut pixels);
		encoder.write_image::<colortype::Gray8>(width, height, &pixels)
			.context(format!("Failed to write frame {}", frame))?;
	}

	Ok(())
}
