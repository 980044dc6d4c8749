use std::error::Error;

use image::RgbaImage;

use crate::snow::Flake;

#[cfg(feature = "cairo")]
pub mod cairo;
pub mod headless;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Per-channel colour and alpha modulation applied when a texture is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Tint {
    pub const NONE: Self = Self::rgba(255, 255, 255, 255);

    /// Black at half opacity, for text shadows.
    pub const SHADOW: Self = Self::rgba(0, 0, 0, 128);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn grey(level: u8) -> Self {
        Self::rgba(level, level, level, 255)
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Modulate premultiplied RGBA pixels in place.
    pub fn apply(&self, pixels: &mut [u8]) {
        if self.is_none() {
            return;
        }
        let factors = [self.r, self.g, self.b];
        for pixel in pixels.chunks_exact_mut(4) {
            for (channel, factor) in pixel[..3].iter_mut().zip(factors.iter()) {
                *channel = scale(scale(*channel, *factor), self.a);
            }
            pixel[3] = scale(pixel[3], self.a);
        }
    }
}

fn scale(value: u8, factor: u8) -> u8 {
    ((value as u16 * factor as u16 + 127) / 255) as u8
}

/// Convert straight-alpha RGBA pixels to premultiplied alpha in place.
pub fn premultiply(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let alpha = pixel[3];
        if alpha != 255 {
            for channel in &mut pixel[..3] {
                *channel = scale(*channel, alpha);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f64,
}

impl TextStyle {
    pub const BIG: Self = Self { size: 382. };
    pub const NORMAL: Self = Self { size: 48. };
    pub const SMALL: Self = Self { size: 32. };
}

/// The rendering surface the clock face draws on.
///
/// Textures are created once and drawn every frame until replaced. A frame is a `clear`,
/// any number of draws, then `present`.
pub trait Display {
    type Texture;
    type Err: Error + Send + Sync + 'static;

    /// Logical size of the screen in pixels (width, height).
    fn get_dimensions(&self) -> (f64, f64);

    fn create_texture(&mut self, image: &RgbaImage) -> Result<Self::Texture, Self::Err>;

    /// Rasterize white `text`, wrapped at `wrap_width` when given.
    fn render_text(
        &mut self,
        text: &str,
        style: TextStyle,
        wrap_width: Option<f64>,
    ) -> Result<Self::Texture, Self::Err>;

    fn texture_size(&self, texture: &Self::Texture) -> (f64, f64);

    fn clear(&mut self) -> Result<(), Self::Err>;

    fn draw_texture(
        &mut self,
        texture: &Self::Texture,
        dst: Rect,
        tint: Tint,
    ) -> Result<(), Self::Err>;

    /// Draw every flake as a white square with the flake's alpha.
    fn draw_snow(&mut self, flakes: &[Flake]) -> Result<(), Self::Err>;

    fn present(&mut self) -> Result<(), Self::Err>;

    /// Draw `texture` scaled to cover the whole screen, centred, cropping whichever axis
    /// overflows.
    fn draw_texture_cover(&mut self, texture: &Self::Texture, tint: Tint) -> Result<(), Self::Err> {
        let dst = cover_rect(self.texture_size(texture), self.get_dimensions());
        self.draw_texture(texture, dst, tint)
    }
}

pub fn cover_rect(texture: (f64, f64), screen: (f64, f64)) -> Rect {
    let (width, height) = texture;
    let (screen_width, screen_height) = screen;
    if width <= 0. || height <= 0. {
        return Rect::new(0., 0., screen_width, screen_height);
    }

    let scale = (screen_width / width).max(screen_height / height);
    let (width, height) = (width * scale, height * scale);
    Rect::new(
        (screen_width - width) / 2.,
        (screen_height - height) / 2.,
        width,
        height,
    )
}
