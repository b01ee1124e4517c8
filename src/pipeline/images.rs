//! Image minify pipeline: lossless re-encode of image assets in place
//!
//! A maintenance task, invoked manually; it is not part of the default
//! task and no watch rule triggers it. An original is only overwritten
//! when the re-encode comes out smaller.

use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use glob::glob;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use std::fs;
use std::path::Path;

/// Quality for JPEG re-encoding
const JPEG_QUALITY: u8 = 80;

/// Re-encode one file into a byte buffer, or `None` for formats we leave
/// untouched.
fn reencode(path: &Path) -> Result<Option<Vec<u8>>, PipelineError> {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return Ok(None),
    };

    match ext.as_str() {
        "png" => {
            let rgba = image::open(path)?.to_rgba8();
            let mut out = Vec::new();
            let encoder =
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?;
            Ok(Some(out))
        }
        "jpg" | "jpeg" => {
            let img = image::open(path)?;
            let mut out = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder.encode_image(&img)?;
            Ok(Some(out))
        }
        _ => Ok(None),
    }
}

/// Run the image minify pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let images_root = ctx.path(&ctx.config.paths.images_root);
    let pattern = format!("{}/**/*", images_root.display());

    let mut optimized = 0;
    let mut skipped = 0;
    for path in glob(&pattern)?.filter_map(Result::ok).filter(|p| p.is_file()) {
        let original_len = fs::metadata(&path)?.len();
        match reencode(&path) {
            Ok(Some(encoded)) if (encoded.len() as u64) < original_len => {
                fs::write(&path, &encoded)?;
                optimized += 1;
            }
            Ok(_) => skipped += 1,
            Err(err) => {
                // One bad asset shouldn't stop the sweep
                report::warn(&format!("skipping {}: {}", path.display(), err));
                skipped += 1;
            }
        }
    }

    report::info(&format!("optimized {} images, left {} untouched", optimized, skipped));
    Ok(PipelineOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_reencode_png_roundtrips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.png");
        RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let encoded = reencode(&path).unwrap().expect("png should re-encode");
        let decoded = image::load_from_memory(&encoded).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_unknown_extension_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "not an image").unwrap();
        assert!(reencode(&path).unwrap().is_none());
    }
}
