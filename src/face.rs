use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use chrono::NaiveDateTime;

use crate::cancel::CancellationToken;
use crate::clock::{self, LocalClock};
use crate::display::{Display, Rect, TextStyle, Tint};
use crate::feed::BackgroundImage;
use crate::slot::SharedSlot;
use crate::snow::SnowField;
use crate::weather::WeatherReport;

const BACKGROUND_TINT: Tint = Tint::grey(200);
const SHADOW_OFFSET: f64 = 1.;
const ADVICE_WRAP: f64 = 0.95;
const FPS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// The slots the render loop reads. Each is written by one refresher.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub background: Arc<SharedSlot<Arc<BackgroundImage>>>,
    pub weather: Arc<SharedSlot<WeatherReport>>,
    pub advice: Arc<SharedSlot<String>>,
}

/// A line of text with its cached texture. The texture is only rebuilt when the text or
/// the wrap width changes.
pub struct TextLabel<T> {
    text: String,
    wrap_width: Option<f64>,
    texture: Option<T>,
    rect: Rect,
}

impl<T> TextLabel<T> {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            wrap_width: None,
            texture: None,
            rect: Rect::new(0., 0., 0., 0.),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the label was last laid out, if it has a texture.
    pub fn rect(&self) -> Option<Rect> {
        self.texture.as_ref().map(|_| self.rect)
    }

    /// Returns whether the texture was re-rendered.
    pub fn update<D, L>(
        &mut self,
        display: &mut D,
        style: TextStyle,
        text: &str,
        wrap_width: Option<f64>,
        layout: L,
    ) -> Result<bool, D::Err>
    where
        D: Display<Texture = T>,
        L: FnOnce(f64, f64) -> Rect,
    {
        if self.texture.is_some() && self.text == text && self.wrap_width == wrap_width {
            return Ok(false);
        }
        if text.is_empty() {
            self.texture = None;
            return Ok(false);
        }

        let texture = display.render_text(text, style, wrap_width)?;
        let (width, height) = display.texture_size(&texture);
        self.rect = layout(width, height);
        self.texture = Some(texture);
        self.text = text.to_owned();
        self.wrap_width = wrap_width;
        Ok(true)
    }

    pub fn draw<D: Display<Texture = T>>(&self, display: &mut D) -> Result<(), D::Err> {
        if let Some(texture) = &self.texture {
            display.draw_texture(
                texture,
                self.rect.offset(SHADOW_OFFSET, SHADOW_OFFSET),
                Tint::SHADOW,
            )?;
            display.draw_texture(texture, self.rect, Tint::NONE)?;
        }
        Ok(())
    }
}

impl<T> Default for TextLabel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the render loop owns: the display, the slots it reads, and the textures
/// derived from them.
pub struct ClockFace<D: Display> {
    display: D,
    sources: Sources,
    clock: LocalClock,
    snow: SnowField,
    background: Option<D::Texture>,
    date: TextLabel<D::Texture>,
    time: TextLabel<D::Texture>,
    weather: TextLabel<D::Texture>,
    advice: TextLabel<D::Texture>,
}

impl<D: Display> ClockFace<D> {
    pub fn new(display: D, sources: Sources, clock: LocalClock, snowflakes: usize) -> Self {
        let (width, height) = display.get_dimensions();
        Self {
            snow: SnowField::new(width as f32, height as f32, snowflakes),
            display,
            sources,
            clock,
            background: None,
            date: TextLabel::new(),
            time: TextLabel::new(),
            weather: TextLabel::new(),
            advice: TextLabel::new(),
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn snow(&self) -> &SnowField {
        &self.snow
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    pub fn weather_label(&self) -> &TextLabel<D::Texture> {
        &self.weather
    }

    pub fn advice_label(&self) -> &TextLabel<D::Texture> {
        &self.advice
    }

    /// Advance by `dt` seconds and present one frame at the current local time.
    pub fn frame(&mut self, dt: f64) -> Result<(), D::Err> {
        let now = self.clock.now();
        self.frame_at(now, dt)
    }

    pub fn frame_at(&mut self, now: NaiveDateTime, dt: f64) -> Result<(), D::Err> {
        self.snow.update(dt);
        self.update_textures(now)?;
        self.render()
    }

    fn update_textures(&mut self, now: NaiveDateTime) -> Result<(), D::Err> {
        let (width, height) = self.display.get_dimensions();

        // The texture keeps its own copy of the pixels, so the decoded image is not kept.
        if let Some(image) = self.sources.background.take() {
            self.background = Some(self.display.create_texture(&image.pixels)?);
        }

        self.date.update(
            &mut self.display,
            TextStyle::NORMAL,
            &clock::date_text(&now),
            None,
            |w, h| Rect::new((width - w) / 2., 60., w, h),
        )?;

        self.time.update(
            &mut self.display,
            TextStyle::BIG,
            &clock::time_text(&now),
            None,
            |w, h| Rect::new((width - w) / 2., (height - h) / 2. - 20., w, h),
        )?;

        let weather = self
            .sources
            .weather
            .snapshot()
            .map(|report| report.summary)
            .unwrap_or_default();
        let time_bottom = self.time.rect().map(|r| r.bottom());
        self.weather.update(
            &mut self.display,
            TextStyle::NORMAL,
            &weather,
            None,
            |w, h| {
                let y = match time_bottom {
                    Some(bottom) => bottom - 80.,
                    None => height / 2. + 140.,
                };
                Rect::new((width - w) / 2., y, w, h)
            },
        )?;

        let advice = self.sources.advice.snapshot().unwrap_or_default();
        let weather_bottom = self.weather.rect().map(|r| r.bottom()).unwrap_or(0.);
        self.advice.update(
            &mut self.display,
            TextStyle::SMALL,
            &advice,
            Some((width * ADVICE_WRAP).floor()),
            |w, h| Rect::new((width - w) / 2., weather_bottom + 10., w, h),
        )?;

        Ok(())
    }

    fn render(&mut self) -> Result<(), D::Err> {
        self.display.clear()?;

        if let Some(background) = &self.background {
            self.display.draw_texture_cover(background, BACKGROUND_TINT)?;
        }
        self.display.draw_snow(self.snow.flakes())?;
        self.date.draw(&mut self.display)?;
        self.time.draw(&mut self.display)?;
        self.weather.draw(&mut self.display)?;
        self.advice.draw(&mut self.display)?;

        self.display.present()
    }
}

/// Drive `face` until the token is cancelled or `max_frames` frames have been presented.
/// Returns the number of frames presented.
pub fn run<D: Display>(
    face: &mut ClockFace<D>,
    frame_interval: Duration,
    max_frames: Option<u64>,
    token: &CancellationToken,
) -> Result<u64, D::Err> {
    let mut frames = 0;
    let mut last = Instant::now();
    let mut window_start = last;
    let mut window_frames = 0u32;

    info!("Render loop started");
    while !token.is_cancelled() {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        face.frame(dt)?;
        frames += 1;
        window_frames += 1;

        let elapsed = now.duration_since(window_start);
        if elapsed >= FPS_LOG_INTERVAL {
            debug!("{:.2} fps", window_frames as f64 / elapsed.as_secs_f64());
            window_start = now;
            window_frames = 0;
        }

        if max_frames.map_or(false, |max| frames >= max) {
            break;
        }
        token.wait_timeout(frame_interval);
    }
    info!("Render loop stopped after {} frames", frames);

    Ok(frames)
}
