//! piet/cairo rasterizer. Text is shaped and rendered into its own bitmap once per
//! change, and every presented frame is composited into a fresh bitmap target and
//! written out as a PNG.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use log::trace;
use piet::kurbo;
use piet::{
    Color, FontFamily, ImageFormat, InterpolationMode, RenderContext, Text, TextLayout,
    TextLayoutBuilder,
};
use thiserror::Error;

use super::{premultiply, Display, Rect, TextStyle, Tint};
use crate::snow::Flake;

#[derive(Debug, Error)]
pub enum CairoError {
    #[error("piet: {0}")]
    Piet(#[from] piet::Error),

    #[error("writing frame: {0}")]
    Image(#[from] image::ImageError),
}

/// Premultiplied RGBA pixels.
#[derive(Debug, Clone)]
pub struct CairoTexture {
    pixels: Arc<Vec<u8>>,
    width: usize,
    height: usize,
}

enum Command {
    Clear,
    Texture {
        texture: CairoTexture,
        dst: Rect,
        tint: Tint,
    },
    Snow(Vec<(kurbo::Rect, f32)>),
}

pub struct CairoDisplay {
    device: piet_common::Device,
    width: usize,
    height: usize,
    font: Option<String>,
    frame_path: PathBuf,
    commands: Vec<Command>,
}

impl CairoDisplay {
    pub const DISPLAY_WIDTH: usize = 1024;
    pub const DISPLAY_HEIGHT: usize = 600;

    pub fn new(frame_path: impl Into<PathBuf>) -> Result<Self, CairoError> {
        Ok(Self {
            device: piet_common::Device::new()?,
            width: Self::DISPLAY_WIDTH,
            height: Self::DISPLAY_HEIGHT,
            font: None,
            frame_path: frame_path.into(),
            commands: Vec::new(),
        })
    }

    /// Use the installed font family `name` instead of the system sans-serif.
    pub fn with_font(mut self, name: impl Into<String>) -> Self {
        self.font = Some(name.into());
        self
    }

    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    fn layout(
        ctx: &mut piet_cairo::CairoRenderContext,
        font: Option<&str>,
        text: &str,
        style: TextStyle,
        wrap_width: Option<f64>,
    ) -> Result<piet_cairo::CairoTextLayout, piet::Error> {
        let family = font
            .and_then(|name| ctx.text().font_family(name))
            .unwrap_or(FontFamily::SANS_SERIF);
        let mut builder = ctx
            .text()
            .new_text_layout(text.to_owned())
            .font(family, style.size)
            .text_color(Color::WHITE);
        if let Some(width) = wrap_width {
            builder = builder.max_width(width);
        }
        builder.build()
    }

    fn write_frame(&self, pixels: &[u8]) -> Result<(), CairoError> {
        // Write next to the target and rename, so readers never see half a PNG.
        let partial = self.frame_path.with_extension("png.partial");
        image::save_buffer_with_format(
            &partial,
            pixels,
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )?;
        std::fs::rename(&partial, &self.frame_path).map_err(image::ImageError::IoError)?;
        Ok(())
    }
}

impl Display for CairoDisplay {
    type Texture = CairoTexture;
    type Err = CairoError;

    fn get_dimensions(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    fn create_texture(&mut self, image: &RgbaImage) -> Result<CairoTexture, CairoError> {
        let mut pixels = image.as_raw().clone();
        premultiply(&mut pixels);
        Ok(CairoTexture {
            pixels: Arc::new(pixels),
            width: image.width() as usize,
            height: image.height() as usize,
        })
    }

    fn render_text(
        &mut self,
        text: &str,
        style: TextStyle,
        wrap_width: Option<f64>,
    ) -> Result<CairoTexture, CairoError> {
        let font = self.font.as_deref();

        let (width, height) = {
            let mut target = self.device.bitmap_target(1, 1, 1.)?;
            let mut ctx = target.render_context();
            let size = Self::layout(&mut ctx, font, text, style, wrap_width)?.size();
            ctx.finish()?;
            (
                size.width.ceil().max(1.) as usize,
                size.height.ceil().max(1.) as usize,
            )
        };

        let mut target = self.device.bitmap_target(width, height, 1.)?;
        {
            let mut ctx = target.render_context();
            ctx.clear(Color::rgba8(0, 0, 0, 0));
            let layout = Self::layout(&mut ctx, font, text, style, wrap_width)?;
            ctx.draw_text(&layout, kurbo::Point::ORIGIN);
            ctx.finish()?;
        }
        let buf = target.to_image_buf(ImageFormat::RgbaPremul)?;

        Ok(CairoTexture {
            pixels: Arc::new(buf.raw_pixels().to_vec()),
            width: buf.width(),
            height: buf.height(),
        })
    }

    fn texture_size(&self, texture: &CairoTexture) -> (f64, f64) {
        (texture.width as f64, texture.height as f64)
    }

    fn clear(&mut self) -> Result<(), CairoError> {
        self.commands.clear();
        self.commands.push(Command::Clear);
        Ok(())
    }

    fn draw_texture(
        &mut self,
        texture: &CairoTexture,
        dst: Rect,
        tint: Tint,
    ) -> Result<(), CairoError> {
        self.commands.push(Command::Texture {
            texture: texture.clone(),
            dst,
            tint,
        });
        Ok(())
    }

    fn draw_snow(&mut self, flakes: &[Flake]) -> Result<(), CairoError> {
        self.commands.push(Command::Snow(
            flakes
                .iter()
                .map(|f| {
                    let (x, y, size) = (f.x as f64, f.y as f64, f.size as f64);
                    (kurbo::Rect::new(x, y, x + size, y + size), f.alpha)
                })
                .collect(),
        ));
        Ok(())
    }

    fn present(&mut self) -> Result<(), CairoError> {
        let commands = std::mem::take(&mut self.commands);
        let mut target = self.device.bitmap_target(self.width, self.height, 1.)?;
        {
            let mut ctx = target.render_context();
            for command in &commands {
                match command {
                    Command::Clear => ctx.clear(Color::BLACK),
                    Command::Texture { texture, dst, tint } => {
                        let tinted;
                        let pixels: &[u8] = if tint.is_none() {
                            &texture.pixels
                        } else {
                            let mut copy = texture.pixels.as_ref().clone();
                            tint.apply(&mut copy);
                            tinted = copy;
                            &tinted
                        };
                        let image = ctx.make_image(
                            texture.width,
                            texture.height,
                            pixels,
                            ImageFormat::RgbaPremul,
                        )?;
                        ctx.draw_image(
                            &image,
                            kurbo::Rect::new(dst.x, dst.y, dst.x + dst.width, dst.bottom()),
                            InterpolationMode::Bilinear,
                        );
                    }
                    Command::Snow(quads) => {
                        for (rect, alpha) in quads {
                            ctx.fill(*rect, &Color::rgba(1., 1., 1., *alpha as f64));
                        }
                    }
                }
            }
            ctx.finish()?;
        }

        let frame = target.to_image_buf(ImageFormat::RgbaPremul)?;
        self.write_frame(frame.raw_pixels())?;
        trace!("wrote frame to {}", self.frame_path.display());
        Ok(())
    }
}
