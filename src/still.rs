use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::utils::wrap_text;

pub const CHARS_PER_LINE: usize = 35;
pub const LINE_HEIGHT: u32 = 50;
pub const FONT_SIZE: u32 = 40;

pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Font handed to ffmpeg's drawtext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontChoice {
    File(PathBuf),
    /// Fontconfig family name, used when no candidate file exists.
    Family(String),
}

impl FontChoice {
    pub fn resolve<P: AsRef<Path>>(candidates: &[P]) -> Self {
        candidates
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.is_file())
            .map(|p| FontChoice::File(p.to_path_buf()))
            .unwrap_or_else(|| FontChoice::Family("Sans".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct StillLine {
    pub text: String,
    pub text_path: PathBuf,
    pub y: u32,
}

/// A background image plus the centred text lines to draw over it.
#[derive(Debug, Clone)]
pub struct Still {
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub font: FontChoice,
    pub font_size: u32,
    pub lines: Vec<StillLine>,
}

impl Still {
    pub fn files(&self) -> Vec<PathBuf> {
        std::iter::once(self.image_path.clone())
            .chain(self.lines.iter().map(|l| l.text_path.clone()))
            .collect()
    }
}

pub struct StillComposer {
    pub width: u32,
    pub height: u32,
    font: FontChoice,
}

impl StillComposer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_fonts(width, height, FONT_CANDIDATES)
    }

    pub fn with_fonts<P: AsRef<Path>>(width: u32, height: u32, candidates: &[P]) -> Self {
        let font = FontChoice::resolve(candidates);
        debug!("Using font {:?}", font);
        Self {
            width,
            height,
            font,
        }
    }

    /// Writes `still_<index>.png` and one text file per wrapped line into `dir`.
    pub fn compose(
        &self,
        text: &str,
        background: Rgb<u8>,
        dir: &Path,
        index: usize,
    ) -> anyhow::Result<Still> {
        let image_path = dir.join(format!("still_{:03}.png", index));
        RgbImage::from_pixel(self.width, self.height, background)
            .save(&image_path)
            .with_context(|| format!("Failed to write still {}", image_path.display()))?;

        let wrapped = wrap_text(text, CHARS_PER_LINE);
        let positions = line_positions(self.height, wrapped.len());
        let mut lines = Vec::with_capacity(wrapped.len());
        for (i, (line, y)) in wrapped.into_iter().zip(positions).enumerate() {
            let text_path = dir.join(format!("still_{:03}_line_{}.txt", index, i));
            fs::write(&text_path, &line)
                .with_context(|| format!("Failed to write {}", text_path.display()))?;
            lines.push(StillLine { text: line, text_path, y });
        }

        Ok(Still {
            image_path,
            width: self.width,
            height: self.height,
            font: self.font.clone(),
            font_size: FONT_SIZE,
            lines,
        })
    }
}

/// Top y of each line for a block vertically centred on the canvas.
pub fn line_positions(height: u32, count: usize) -> Vec<u32> {
    let block = count as u32 * LINE_HEIGHT;
    let top = (height / 2).saturating_sub(block / 2);
    (0..count as u32).map(|i| top + i * LINE_HEIGHT).collect()
}
