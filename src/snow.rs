use std::f32::consts::TAU;

use rand::Rng;

const SINE_SAMPLES: usize = 1024;

/// `sin` sampled over one period, read back with linear interpolation.
#[derive(Debug, Clone)]
struct SineTable {
    samples: Vec<f32>,
}

impl SineTable {
    fn new() -> Self {
        Self {
            samples: (0..SINE_SAMPLES)
                .map(|i| (i as f32 / SINE_SAMPLES as f32 * TAU).sin())
                .collect(),
        }
    }

    fn sin(&self, x: f32) -> f32 {
        let position = x.rem_euclid(TAU) / TAU * SINE_SAMPLES as f32;
        let index = position.floor();
        let fraction = position - index;
        let a = self.samples[index as usize % SINE_SAMPLES];
        let b = self.samples[(index as usize + 1) % SINE_SAMPLES];
        a + (b - a) * fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flake {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub speed_y: f32,
    pub sway_phase: f32,
    pub sway_speed: f32,
    /// 0.2 (far) to 1.0 (near).
    pub depth: f32,
    pub alpha: f32,
}

impl Flake {
    fn random<R: Rng>(rng: &mut R, width: f32, height: f32) -> Self {
        let depth = rng.gen_range(0.2..1.0);
        let size = 2. + depth * 3.;
        Self {
            x: rng.gen_range(0.0..=width),
            y: rng.gen_range(-50.0..=height),
            size,
            speed_y: 30. + depth * 60.,
            sway_phase: rng.gen_range(0.0..TAU),
            sway_speed: 1. + depth * 2.,
            depth,
            alpha: 0.2 + depth * 0.8,
        }
    }
}

/// Falling snow across the whole screen. Near flakes are bigger, faster, brighter and
/// pushed harder by the wind; far flakes sway more on their own.
#[derive(Debug, Clone)]
pub struct SnowField {
    width: f32,
    height: f32,
    wind_timer: f64,
    flakes: Vec<Flake>,
    sine: SineTable,
}

impl SnowField {
    pub fn new(width: f32, height: f32, count: usize) -> Self {
        Self::with_rng(&mut rand::thread_rng(), width, height, count)
    }

    pub fn with_rng<R: Rng>(rng: &mut R, width: f32, height: f32, count: usize) -> Self {
        let width = width.max(1.);
        let height = height.max(1.);
        Self {
            width,
            height,
            wind_timer: 0.,
            flakes: (0..count)
                .map(|_| Flake::random(rng, width, height))
                .collect(),
            sine: SineTable::new(),
        }
    }

    pub fn flakes(&self) -> &[Flake] {
        &self.flakes
    }

    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Horizontal wind in pixels per second at the current time.
    pub fn wind(&self) -> f32 {
        let t = self.wind_timer as f32;
        let slow = 20. * self.sine.sin(t * 0.5);
        let gust = 10. * self.sine.sin(t * 2.5);
        slow + gust + 5.
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        self.wind_timer += dt;
        let wind = self.wind();
        let t = self.wind_timer as f32;
        let dt = dt as f32;
        let (width, height) = (self.width, self.height);
        let sine = &self.sine;

        for f in &mut self.flakes {
            f.y += f.speed_y * dt;
            let sway = sine.sin(t * f.sway_speed + f.sway_phase) * (10. * (1. - f.depth));
            f.x += (wind * f.depth + sway) * dt;

            if f.y > height {
                f.y = -f.size;
                f.x = (f.x + 100.) % width;
            }
            if f.x > width {
                f.x = -f.size;
            } else if f.x < -f.size {
                f.x = width;
            }
        }
    }
}
