use std::error::Error;
use std::time::Duration;

use log::info;

use snowclock::advice::{AdviceSource, LlmSettings};
use snowclock::clock::LocalClock;
use snowclock::config::Config;
use snowclock::face::{self, ClockFace, Sources};
use snowclock::feed::ImageFeed;
use snowclock::weather::WeatherSource;
use snowclock::{http, shutdown, CancellationToken, RefresherSet, Schedule};

/// The advice refresher waits this long before its first cycle so the first weather
/// report has a chance to land.
const ADVICE_DELAY: Duration = Duration::from_secs(5);

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let clock = LocalClock;
    let config = Config::from_env()?;

    let token = CancellationToken::new();
    shutdown::cancel_on_ctrl_c(token.clone())?;

    let sources = Sources::default();
    let client = http::client()?;

    let mut refreshers = RefresherSet::new(token.clone());
    refreshers.spawn(
        "image",
        ImageFeed::new(client.clone(), &config.image_feed_url, clock),
        sources.background.clone(),
        Schedule::every(config.image_interval),
    )?;
    refreshers.spawn(
        "weather",
        WeatherSource::new(
            client.clone(),
            &config.weather_url,
            config.latitude,
            config.longitude,
        ),
        sources.weather.clone(),
        Schedule::every(config.weather_interval),
    )?;
    if config.llm_api_key.is_none() {
        info!("No LLM API key configured, using built-in advice");
    }
    refreshers.spawn(
        "advice",
        AdviceSource::new(
            client,
            LlmSettings {
                url: config.llm_url.clone(),
                model: config.llm_model.clone(),
                api_key: config.llm_api_key.clone(),
                city: config.city.clone(),
            },
            clock,
            sources.weather.clone(),
        ),
        sources.advice.clone(),
        Schedule::every(config.advice_interval).with_initial_delay(ADVICE_DELAY),
    )?;

    let display = open_display(&config)?;
    let mut face = ClockFace::new(display, sources, clock, config.snowflakes);
    let result = face::run(
        &mut face,
        config.frame_interval,
        config.max_frames,
        &token,
    );

    info!("Stopping {} refreshers", refreshers.len());
    refreshers.shutdown();
    result?;

    Ok(())
}

#[cfg(feature = "cairo")]
fn open_display(
    config: &Config,
) -> Result<snowclock::display::cairo::CairoDisplay, snowclock::display::cairo::CairoError> {
    info!("Writing frames to {}", config.frame_path.display());
    snowclock::display::cairo::CairoDisplay::new(&config.frame_path)
}

#[cfg(not(feature = "cairo"))]
fn open_display(
    _config: &Config,
) -> Result<snowclock::display::headless::HeadlessDisplay, snowclock::display::headless::HeadlessError>
{
    info!("Built without the cairo feature, rendering headless");
    Ok(snowclock::display::headless::HeadlessDisplay::new())
}
