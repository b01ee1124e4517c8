//! Sprite pipeline: packs individual images into one sheet and generates
//! the stylesheet fragment the style pipeline consumes
//!
//! Uses shelf bin packing: sprites are sorted by height (tallest first)
//! and placed into horizontal shelves with fixed padding.

use crate::pipeline::{PipelineContext, PipelineError, PipelineOutcome};
use crate::report;
use glob::glob;
use image::{Rgba, RgbaImage};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// Padding between packed sprites in pixels
pub const SPRITE_PADDING: u32 = 10;

/// Maximum sheet width before a new shelf is opened
const MAX_SHEET_WIDTH: u32 = 1024;

/// Transparent color for the sheet background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// One sprite's position and size within the packed sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteFrame {
    /// Selector name, taken from the source image's base filename
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A shelf in the shelf packing algorithm
#[derive(Debug)]
struct Shelf {
    y: u32,
    height: u32,
    width_used: u32,
}

/// Pack named images into a single sheet.
///
/// Input order does not matter: sprites are sorted by height then name so
/// the layout is deterministic for a given input set.
pub fn pack(mut sprites: Vec<(String, RgbaImage)>) -> (RgbaImage, Vec<SpriteFrame>) {
    if sprites.is_empty() {
        return (RgbaImage::from_pixel(1, 1, TRANSPARENT), Vec::new());
    }

    sprites.sort_by(|a, b| {
        b.1.height().cmp(&a.1.height()).then_with(|| a.0.cmp(&b.0))
    });

    let mut shelves: Vec<Shelf> = Vec::new();
    let mut frames = Vec::with_capacity(sprites.len());
    let mut sheet_height = 0;

    for (name, image) in &sprites {
        let (w, h) = (image.width(), image.height());
        let slot = shelves
            .iter_mut()
            .find(|shelf| shelf.width_used + w + SPRITE_PADDING <= MAX_SHEET_WIDTH && h <= shelf.height);

        let (x, y) = match slot {
            Some(shelf) => {
                let x = shelf.width_used + SPRITE_PADDING;
                shelf.width_used = x + w;
                (x, shelf.y)
            }
            None => {
                let y = sheet_height + if shelves.is_empty() { 0 } else { SPRITE_PADDING };
                shelves.push(Shelf { y, height: h, width_used: w });
                sheet_height = y + h;
                (0, y)
            }
        };

        frames.push(SpriteFrame { name: name.clone(), x, y, w, h });
    }

    let sheet_width = frames.iter().map(|f| f.x + f.w).max().unwrap_or(1);
    let mut sheet = RgbaImage::from_pixel(sheet_width.max(1), sheet_height.max(1), TRANSPARENT);

    for ((_, image), frame) in sprites.iter().zip(&frames) {
        for py in 0..image.height() {
            for px in 0..image.width() {
                sheet.put_pixel(frame.x + px, frame.y + py, *image.get_pixel(px, py));
            }
        }
    }

    (sheet, frames)
}

/// Render the stylesheet fragment for the packed frames.
///
/// One rule per source image, selector `.` + base filename. The sheet URL
/// is relative to the compiled bundle's directory, not the SCSS source
/// directory the fragment sits in.
pub fn render_fragment(frames: &[SpriteFrame]) -> String {
    let mut fragment = String::new();
    let mut sorted: Vec<&SpriteFrame> = frames.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for frame in sorted {
        let _ = write!(
            fragment,
            ".{} {{\n  background-image: url('../Images/Sprite.png');\n  background-position: -{}px -{}px;\n  width: {}px;\n  height: {}px;\n}}\n",
            frame.name, frame.x, frame.y, frame.w, frame.h
        );
    }
    fragment
}

fn load_sources(dir: &std::path::Path) -> Result<Vec<(String, RgbaImage)>, PipelineError> {
    let pattern = format!("{}/*.png", dir.display());
    let mut sources = Vec::new();
    for path in glob(&pattern)?.filter_map(Result::ok) {
        let name = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => continue,
        };
        let image = image::open(&path)?.to_rgba8();
        sources.push((name, image));
    }
    Ok(sources)
}

/// Run the sprite pipeline.
pub fn run(ctx: &PipelineContext<'_>) -> Result<PipelineOutcome, PipelineError> {
    let sprite_src = ctx.path(&ctx.config.paths.sprite_src);
    let sheet_path: PathBuf = ctx.path(&ctx.config.paths.sprite_image());
    let fragment_path: PathBuf = ctx.path(&ctx.config.paths.sprite_fragment());

    let sources = load_sources(&sprite_src)?;
    let count = sources.len();
    let (sheet, frames) = pack(sources);

    if let Some(parent) = sheet_path.parent() {
        fs::create_dir_all(parent)?;
    }
    sheet.save(&sheet_path)?;

    if let Some(parent) = fragment_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&fragment_path, render_fragment(&frames))?;

    report::info(&format!(
        "packed {} sprites into {} ({}x{})",
        count,
        sheet_path.display(),
        sheet.width(),
        sheet.height()
    ));
    Ok(PipelineOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn test_pack_empty() {
        let (sheet, frames) = pack(Vec::new());
        assert_eq!((sheet.width(), sheet.height()), (1, 1));
        assert!(frames.is_empty());
    }

    #[test]
    fn test_pack_respects_padding() {
        let (_, frames) = pack(vec![
            ("a".to_string(), solid(16, 16)),
            ("b".to_string(), solid(16, 16)),
        ]);
        assert_eq!(frames.len(), 2);
        // Same shelf, second sprite offset by width + padding
        assert_eq!(frames[0].x, 0);
        assert_eq!(frames[1].x, 16 + SPRITE_PADDING);
        assert_eq!(frames[0].y, frames[1].y);
    }

    #[test]
    fn test_pack_no_overlap() {
        let (_, frames) = pack(vec![
            ("a".to_string(), solid(20, 30)),
            ("b".to_string(), solid(40, 10)),
            ("c".to_string(), solid(8, 8)),
        ]);
        for (i, f) in frames.iter().enumerate() {
            for g in frames.iter().skip(i + 1) {
                let disjoint_x = f.x + f.w <= g.x || g.x + g.w <= f.x;
                let disjoint_y = f.y + f.h <= g.y || g.y + g.h <= f.y;
                assert!(disjoint_x || disjoint_y, "{:?} overlaps {:?}", f, g);
            }
        }
    }

    #[test]
    fn test_pack_is_deterministic() {
        let input = || {
            vec![
                ("b".to_string(), solid(16, 16)),
                ("a".to_string(), solid(16, 16)),
                ("c".to_string(), solid(8, 24)),
            ]
        };
        let (_, first) = pack(input());
        let mut reversed = input();
        reversed.reverse();
        let (_, second) = pack(reversed);
        let mut first = first;
        let mut second = second;
        first.sort_by(|a, b| a.name.cmp(&b.name));
        second.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(first, second);
    }

    #[test]
    fn test_fragment_selectors() {
        let frames = vec![SpriteFrame { name: "icon-home".to_string(), x: 0, y: 0, w: 16, h: 16 }];
        let fragment = render_fragment(&frames);
        assert!(fragment.starts_with(".icon-home {"));
        assert!(fragment.contains("background-position: -0px -0px;"));
        assert!(fragment.contains("width: 16px;"));
    }
}
