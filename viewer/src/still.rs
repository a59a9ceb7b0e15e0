use std::path::Path;

use frame_filter_common::frame::{Frame, FrameError, GRAY};
use image::ImageReader;
use tracing::debug;

/// Decode an image file into a grayscale frame for the static source.
pub fn load_still(path: &Path) -> Result<Frame, StillError> {
    let img = ImageReader::open(path)
        .map_err(|e| StillError::Open(path.display().to_string(), e))?
        .with_guessed_format()
        .map_err(|e| StillError::Open(path.display().to_string(), e))?
        .decode()?;

    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    debug!(path = %path.display(), width, height, "decoded still image");
    Ok(Frame::new(width as usize, height as usize, GRAY, gray.into_raw())?)
}

#[derive(Debug, thiserror::Error)]
pub enum StillError {
    #[error("failed to open {0}: {1}")]
    Open(String, std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decoded image has an unexpected shape: {0}")]
    Frame(#[from] FrameError),
}
