//! A display without a screen. Draw calls are recorded per frame and text metrics are
//! estimated from the character count, which is enough to lay out and exercise the
//! clock face without a windowing system.

use image::RgbaImage;
use log::trace;
use thiserror::Error;

use super::{Display, Rect, TextStyle, Tint};
use crate::snow::Flake;

// Rough advance and line height of a proportional font, relative to its size.
const ADVANCE: f64 = 0.55;
const LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("cannot create a texture from an empty image")]
    EmptyImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessTexture {
    Image { width: u32, height: u32 },
    Text { text: String, width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Texture {
        texture: HeadlessTexture,
        dst: Rect,
        tint: Tint,
    },
    Snow {
        flakes: usize,
    },
}

#[derive(Debug)]
pub struct HeadlessDisplay {
    width: f64,
    height: f64,
    pending: Vec<DrawOp>,
    last_frame: Vec<DrawOp>,
    frames: u64,
    text_renders: u64,
}

impl HeadlessDisplay {
    pub const DISPLAY_WIDTH: f64 = 1024.;
    pub const DISPLAY_HEIGHT: f64 = 600.;

    pub fn new() -> Self {
        Self::with_dimensions(Self::DISPLAY_WIDTH, Self::DISPLAY_HEIGHT)
    }

    pub fn with_dimensions(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pending: Vec::new(),
            last_frame: Vec::new(),
            frames: 0,
            text_renders: 0,
        }
    }

    /// Number of presented frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of `render_text` calls so far.
    pub fn text_renders(&self) -> u64 {
        self.text_renders
    }

    pub fn last_frame(&self) -> &[DrawOp] {
        &self.last_frame
    }

    /// Texts drawn untinted in the last presented frame, in draw order.
    pub fn last_frame_texts(&self) -> Vec<&str> {
        self.last_frame
            .iter()
            .filter_map(|op| match op {
                DrawOp::Texture {
                    texture: HeadlessTexture::Text { text, .. },
                    tint,
                    ..
                } if tint.is_none() => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn measure(text: &str, style: TextStyle, wrap_width: Option<f64>) -> (f64, f64) {
        let advance = style.size * ADVANCE;
        let line = style.size * LINE_HEIGHT;
        let chars = text.chars().count() as f64;
        let width = chars * advance;

        match wrap_width {
            Some(wrap) if width > wrap => {
                let per_line = (wrap / advance).floor().max(1.);
                let lines = (chars / per_line).ceil();
                (per_line * advance, lines * line)
            }
            _ => (width, line),
        }
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    type Texture = HeadlessTexture;
    type Err = HeadlessError;

    fn get_dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn create_texture(&mut self, image: &RgbaImage) -> Result<HeadlessTexture, HeadlessError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(HeadlessError::EmptyImage);
        }
        Ok(HeadlessTexture::Image {
            width: image.width(),
            height: image.height(),
        })
    }

    fn render_text(
        &mut self,
        text: &str,
        style: TextStyle,
        wrap_width: Option<f64>,
    ) -> Result<HeadlessTexture, HeadlessError> {
        self.text_renders += 1;
        let (width, height) = Self::measure(text, style, wrap_width);
        Ok(HeadlessTexture::Text {
            text: text.to_owned(),
            width,
            height,
        })
    }

    fn texture_size(&self, texture: &HeadlessTexture) -> (f64, f64) {
        match texture {
            HeadlessTexture::Image { width, height } => (*width as f64, *height as f64),
            HeadlessTexture::Text { width, height, .. } => (*width, *height),
        }
    }

    fn clear(&mut self) -> Result<(), HeadlessError> {
        self.pending.clear();
        self.pending.push(DrawOp::Clear);
        Ok(())
    }

    fn draw_texture(
        &mut self,
        texture: &HeadlessTexture,
        dst: Rect,
        tint: Tint,
    ) -> Result<(), HeadlessError> {
        self.pending.push(DrawOp::Texture {
            texture: texture.clone(),
            dst,
            tint,
        });
        Ok(())
    }

    fn draw_snow(&mut self, flakes: &[Flake]) -> Result<(), HeadlessError> {
        self.pending.push(DrawOp::Snow {
            flakes: flakes.len(),
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), HeadlessError> {
        self.last_frame = std::mem::take(&mut self.pending);
        self.frames += 1;
        trace!(
            "frame {}: {} draw operations",
            self.frames,
            self.last_frame.len()
        );
        Ok(())
    }
}
