//! Image-file ingestion for batch analysis.
//!
//! Files are vetted before any decode work: extension and size first, then a
//! full decode to RGB8. Oversized or unsupported files are rejected with an
//! error naming the limit so batch callers can report per-file failures.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

/// Upper bound on the encoded file size.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions the batch analyzer accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Whether `path` has a supported image extension (case-insensitive).
pub fn is_supported_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Validate `path` without decoding it. Checks extension and file size.
pub fn validate_image_file(path: &Path) -> Result<()> {
    if !is_supported_format(path) {
        return Err(anyhow!(
            "unsupported image format '{}' (supported: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }
    let meta = std::fs::metadata(path)
        .with_context(|| format!("stat image file {}", path.display()))?;
    if meta.len() > MAX_IMAGE_BYTES {
        return Err(anyhow!(
            "image file {} is {} bytes, limit is {} bytes",
            path.display(),
            meta.len(),
            MAX_IMAGE_BYTES
        ));
    }
    Ok(())
}

/// Load an image file as an RGB frame. Validates first, then decodes.
pub fn load_image_frame(path: &Path) -> Result<Frame> {
    validate_image_file(path)?;
    let image = image::open(path)
        .with_context(|| format!("decode image file {}", path.display()))?
        .into_rgb8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(image.into_raw(), width, height))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_format(Path::new("scene.JPG")));
        assert!(is_supported_format(Path::new("scene.png")));
        assert!(is_supported_format(Path::new("scene.webp")));
        assert!(!is_supported_format(Path::new("scene.gif")));
        assert!(!is_supported_format(Path::new("scene")));
    }

    #[test]
    fn oversized_file_is_rejected_before_decode() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("huge.jpg");
        let file = std::fs::File::create(&path)?;
        file.set_len(MAX_IMAGE_BYTES + 1)?;
        assert!(validate_image_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn garbage_bytes_fail_to_decode() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.png");
        std::fs::File::create(&path)?.write_all(b"not a png")?;
        assert!(load_image_frame(&path).is_err());
        Ok(())
    }

    #[test]
    fn decodes_a_real_png() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.png");
        let img = image::RgbImage::from_fn(8, 6, |x, y| image::Rgb([x as u8, y as u8, 7]));
        img.save(&path)?;

        let frame = load_image_frame(&path)?;
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 6);
        assert_eq!(frame.byte_len(), Frame::expected_len(8, 6));
        Ok(())
    }
}
