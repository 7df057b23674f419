use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use anyhow::Context;
use chrono::TimeZone;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut},
    rect::Rect,
};
use serde::Deserialize;

/// Where and how the capture time is drawn onto each frame.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub enabled: bool,

    /// A TrueType or OpenType font. The built-in 8x8 bitmap font is used
    /// when unset.
    pub font: Option<PathBuf>,

    /// Text height in pixels
    pub size: f32,

    pub x: i32,
    pub y: i32,
    pub color: [u8; 3],
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            enabled: true,
            font: None,
            size: 30.0,
            x: 10,
            y: 440,
            color: [255, 255, 255],
        }
    }
}

enum LabelFont {
    Bitmap,
    Outline(FontVec),
}

/// Draws a frame's capture time onto it.
pub struct FrameLabeler {
    font: LabelFont,
    size: f32,
    x: i32,
    y: i32,
    color: Rgb<u8>,
}

impl FrameLabeler {
    pub fn load(config: &LabelConfig) -> anyhow::Result<Self> {
        let font = match &config.font {
            Some(path) => {
                let data = std::fs::read(path)
                    .with_context(|| format!("could not read font {}", path.display()))?;
                let font = FontVec::try_from_vec(data)
                    .with_context(|| format!("invalid font {}", path.display()))?;
                LabelFont::Outline(font)
            }
            None => LabelFont::Bitmap,
        };

        Ok(FrameLabeler {
            font,
            size: config.size,
            x: config.x,
            y: config.y,
            color: Rgb(config.color),
        })
    }

    pub fn draw(&self, image: &mut RgbImage, text: &str) {
        match &self.font {
            LabelFont::Outline(font) => {
                draw_text_mut(image, self.color, self.x, self.y, self.size, font, text)
            }
            LabelFont::Bitmap => self.draw_bitmap(image, text),
        }
    }

    fn draw_bitmap(&self, image: &mut RgbImage, text: &str) {
        let scale = (self.size / 8.0).round().max(1.0) as u32;
        let advance = 8 * scale as i32;

        for (i, c) in text.chars().enumerate() {
            let glyph = match BASIC_FONTS.get(c) {
                Some(glyph) => glyph,
                None => continue,
            };

            let left = self.x + i as i32 * advance;

            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8i32 {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }

                    let rect = Rect::at(
                        left + col * scale as i32,
                        self.y + row as i32 * scale as i32,
                    )
                    .of_size(scale, scale);

                    draw_filled_rect_mut(image, rect, self.color);
                }
            }
        }
    }

    /// Reads the jpeg at `source`, draws `text` onto it and writes the
    /// result to `dest`.
    pub fn label_file(&self, source: &Path, dest: &Path, text: &str) -> anyhow::Result<()> {
        let data = std::fs::read(source)?;

        let mut image = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)
            .with_context(|| format!("could not decode {}", source.display()))?
            .to_rgb8();

        self.draw(&mut image, text);

        image
            .save_with_format(dest, ImageFormat::Jpeg)
            .with_context(|| format!("could not write {}", dest.display()))?;

        Ok(())
    }
}

/// The capture time shown on a frame, e.g. `07:35 PM`.
pub fn label_text<Tz: TimeZone>(tz: &Tz, timestamp: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_opt(timestamp, 0).single() {
        Some(at) => at.format("%I:%M %p").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn lit_pixels(image: &RgbImage) -> usize {
        image.pixels().filter(|p| p.0.iter().any(|&c| c > 128)).count()
    }

    #[test]
    fn text_is_twelve_hour_local_time() {
        // 2018-01-02 02:35 UTC
        let ts = 1514860500;

        assert_eq!(label_text(&Utc, ts), "02:35 AM");
        assert_eq!(
            label_text(&FixedOffset::west_opt(7 * 3600).unwrap(), ts),
            "07:35 PM"
        );
    }

    #[test]
    fn bitmap_label_lands_at_configured_position() {
        let labeler = FrameLabeler::load(&LabelConfig::default()).unwrap();
        let mut image = RgbImage::new(640, 480);

        labeler.draw(&mut image, "07:35 PM");

        assert!(lit_pixels(&image) > 0);

        // nothing drawn above the label row
        let above = image
            .enumerate_pixels()
            .filter(|(_, y, p)| *y < 440 && p.0 != [0, 0, 0])
            .count();
        assert_eq!(above, 0);
    }

    #[test]
    fn label_outside_the_frame_is_clipped() {
        let labeler = FrameLabeler::load(&LabelConfig::default()).unwrap();
        let mut image = RgbImage::new(64, 48);

        labeler.draw(&mut image, "07:35 PM");

        assert_eq!(lit_pixels(&image), 0);
    }

    #[test]
    fn missing_font_is_an_error() {
        let config = LabelConfig {
            font: Some("/nonexistent/font.ttf".into()),
            ..Default::default()
        };

        assert!(FrameLabeler::load(&config).is_err());
    }

    #[test]
    fn labeled_file_differs_from_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("snapshot-1514860500.jpg");
        let dest = dir.path().join("frame-000000.jpg");

        RgbImage::new(640, 480)
            .save_with_format(&source, ImageFormat::Jpeg)
            .unwrap();

        let labeler = FrameLabeler::load(&LabelConfig::default()).unwrap();
        labeler.label_file(&source, &dest, "07:35 PM").unwrap();

        assert_ne!(std::fs::read(&source).unwrap(), std::fs::read(&dest).unwrap());

        let labeled = image::open(&dest).unwrap().to_rgb8();
        assert!(lit_pixels(&labeled) > 0);
    }
}
