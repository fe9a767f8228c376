use crate::encoder::BitMatrix;
use crate::render::Bitmap;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Directory bitmaps are saved to when no directory is given.
pub const DEFAULT_DIRECTORY: &str = "generated";

/*---- Utilities ----*/

// Returns a string of SVG code for an image depicting the given matrix,
// one unit per cell. The matrix already carries its quiet zone.
// The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(matrix: &BitMatrix) -> String {
	let mut result = String::new();
	result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
	result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
	result += &format!(
		"<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {} {}\" stroke=\"none\">\n",
		matrix.width(), matrix.height());
	result += "\t<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n";
	result += "\t<path d=\"";
	let mut first = true;
	for y in 0 .. matrix.height() {
		for x in 0 .. matrix.width() {
			if matrix.get(x, y) {
				if !first {
					result += " ";
				}
				first = false;
				result += &format!("M{},{}h1v1h-1z", x, y);
			}
		}
	}
	result += "\" fill=\"#000000\"/>\n";
	result += "</svg>\n";
	result
}

/// Renders the matrix as text, two characters per cell so cells come out roughly square.
pub fn to_text(matrix: &BitMatrix) -> String {
	let mut out = String::new();
	for y in 0 .. matrix.height() {
		for x in 0 .. matrix.width() {
			let c: char = if matrix.get(x, y) { '█' } else { ' ' };
			out.push(c);
			out.push(c);
		}
		out.push('\n');
	}
	out
}

/// Prints the given matrix to the console.
pub fn print_matrix(matrix: &BitMatrix) {
	println!("{}", to_text(matrix));
}

/// Saves a bitmap as a PNG file.
///
/// # Arguments
///
/// * `bitmap` - The bitmap to save.
/// * `directory_path` - Optional. The directory the image is saved to. Defaults to [`DEFAULT_DIRECTORY`] and is created if missing.
/// * `filename` - Optional. The file name without extension. If not provided, a timestamp-based name is used.
///
/// # Returns
///
/// The path of the written file.
///
/// # Errors
///
/// Returns an `image::ImageError` if the directory cannot be created or the image cannot be written.
///
/// # Example
///
/// ```no_run
/// use helloqr::encoder::QrEncoder;
/// use helloqr::helper::save_bitmap;
/// use helloqr::render::QrRenderer;
///
/// let bitmap = QrRenderer::new(QrEncoder).render("Hello, World!", 400, None).unwrap();
/// let path = save_bitmap(&bitmap, Some("images"), Some("qr_code")).unwrap();
/// println!("saved to {}", path.display());
/// ```
pub fn save_bitmap(bitmap: &Bitmap, directory_path: Option<&str>, filename: Option<&str>) -> Result<PathBuf, image::ImageError> {
	let directory_path = directory_path.unwrap_or(DEFAULT_DIRECTORY);
	let filename = match filename {
		Some(name) => name.to_string(),
		None => timestamp_name(),
	};

	let file_path = Path::new(directory_path).join(format!("{}.png", filename));

	if !Path::new(directory_path).exists() {
		fs::create_dir_all(directory_path)?;
	}

	bitmap.save(&file_path)?;
	info!(path = %file_path.display(), "saved QR code");
	Ok(file_path)
}

fn timestamp_name() -> String {
	let since_the_epoch = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default();
	format!("qr_{}", since_the_epoch.as_millis())
}
