//! The three sources against the local mock server.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use snowclock::advice::{self, AdviceSource, LlmSettings};
use snowclock::clock::LocalClock;
use snowclock::face::Sources;
use snowclock::feed::ImageFeed;
use snowclock::mock::{self, MockServer};
use snowclock::weather::WeatherSource;
use snowclock::{http, CancellationToken, Fetch, RefresherSet, Schedule, SharedSlot, Update};

const CLOCK: LocalClock = LocalClock;

fn settings(server: &MockServer, api_key: Option<&str>) -> LlmSettings {
    LlmSettings {
        url: server.llm_url(),
        model: "mock-model".to_string(),
        api_key: api_key.map(str::to_string),
        city: "Amsterdam".to_string(),
    }
}

fn fresh<T>(update: Update<T>) -> T {
    match update {
        Update::Fresh(value) => value,
        Update::Unchanged => panic!("expected a fresh value, got Unchanged"),
        Update::Pending => panic!("expected a fresh value, got Pending"),
    }
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn image_feed_downloads_todays_image_once() {
    let server = MockServer::spawn(false).unwrap();
    let mut feed = ImageFeed::new(http::client().unwrap(), server.feed_url(), CLOCK);

    let image = fresh(feed.fetch().unwrap());
    assert_eq!(image.pixels.width(), mock::IMAGE_WIDTH);
    assert_eq!(image.pixels.height(), mock::IMAGE_HEIGHT);
    assert!(image.url.ends_with("_1920.jpg"));
    assert_eq!(feed.last_url(), Some(image.url.as_str()));

    assert!(matches!(feed.fetch().unwrap(), Update::Unchanged));
}

#[test]
fn rotating_feed_yields_new_images() {
    let server = MockServer::spawn(true).unwrap();
    let mut feed = ImageFeed::new(http::client().unwrap(), server.feed_url(), CLOCK);

    let first = fresh(feed.fetch().unwrap());
    let second = fresh(feed.fetch().unwrap());
    assert_ne!(first.url, second.url);
}

#[test]
fn missing_feed_is_an_error() {
    let server = MockServer::spawn(false).unwrap();
    let mut feed = ImageFeed::new(http::client().unwrap(), server.url("/nope"), CLOCK);
    assert!(feed.fetch().is_err());
    assert_eq!(feed.last_url(), None);
}

#[test]
fn weather_source_reports_current_weather() {
    let server = MockServer::spawn(false).unwrap();
    let client = http::client().unwrap();
    let mut source = WeatherSource::new(client, server.weather_url(), 52.37, 4.89);

    let report = fresh(source.fetch().unwrap());
    assert_eq!(report.observation.temperature, mock::FORECAST_TEMPERATURE);
    assert_eq!(report.summary, "-3°C, снежок, ветерок 4 м/с");
}

#[test]
fn advice_comes_from_the_llm_when_keyed() {
    let server = MockServer::spawn(false).unwrap();
    let client = http::client().unwrap();
    let weather = Arc::new(SharedSlot::new());
    let mut source = AdviceSource::new(
        client.clone(),
        settings(&server, Some("test-key")),
        CLOCK,
        weather.clone(),
    );

    assert!(matches!(source.fetch().unwrap(), Update::Pending));

    let mut forecast = WeatherSource::new(client, server.weather_url(), 52.37, 4.89);
    weather.publish(fresh(forecast.fetch().unwrap()));

    assert_eq!(fresh(source.fetch().unwrap()), "теплую куртку, шапку и шарф");
    assert!(matches!(source.fetch().unwrap(), Update::Unchanged));
}

#[test]
fn advice_falls_back_without_a_key() {
    let server = MockServer::spawn(false).unwrap();
    let client = http::client().unwrap();
    let weather = Arc::new(SharedSlot::new());
    let mut forecast = WeatherSource::new(client.clone(), server.weather_url(), 52.37, 4.89);
    weather.publish(fresh(forecast.fetch().unwrap()));

    let mut source = AdviceSource::new(client, settings(&server, None), CLOCK, weather);
    assert_eq!(
        fresh(source.fetch().unwrap()),
        advice::basic_advice(mock::FORECAST_TEMPERATURE)
    );
}

#[test]
fn advice_falls_back_when_the_llm_is_unreachable() {
    let server = MockServer::spawn(false).unwrap();
    let client = http::client().unwrap();
    let weather = Arc::new(SharedSlot::new());
    let mut forecast = WeatherSource::new(client.clone(), server.weather_url(), 52.37, 4.89);
    weather.publish(fresh(forecast.fetch().unwrap()));

    let mut settings = settings(&server, Some("test-key"));
    settings.url = server.url("/missing");
    let mut source = AdviceSource::new(client, settings, CLOCK, weather);

    let fallback = advice::basic_advice(mock::FORECAST_TEMPERATURE);
    assert_eq!(fresh(source.fetch().unwrap()), fallback);
    // Not marked as advised, so the next cycle asks again.
    assert_eq!(fresh(source.fetch().unwrap()), fallback);
}

#[test]
fn refreshers_fill_every_slot() {
    let server = MockServer::spawn(false).unwrap();
    let client = http::client().unwrap();
    let sources = Sources::default();
    let token = CancellationToken::new();

    let mut refreshers = RefresherSet::new(token.clone());
    refreshers
        .spawn(
            "image",
            ImageFeed::new(client.clone(), server.feed_url(), CLOCK),
            sources.background.clone(),
            Schedule::every(Duration::from_secs(60)),
        )
        .unwrap();
    refreshers
        .spawn(
            "weather",
            WeatherSource::new(client.clone(), server.weather_url(), 52.37, 4.89),
            sources.weather.clone(),
            Schedule::every(Duration::from_secs(60)),
        )
        .unwrap();
    refreshers
        .spawn(
            "advice",
            AdviceSource::new(
                client,
                settings(&server, Some("test-key")),
                CLOCK,
                sources.weather.clone(),
            ),
            sources.advice.clone(),
            Schedule::every(Duration::from_secs(60)).with_pending_retry(Duration::from_millis(20)),
        )
        .unwrap();
    assert_eq!(refreshers.len(), 3);

    let filled = wait_until(Duration::from_secs(20), || {
        !sources.background.is_empty() && !sources.weather.is_empty() && !sources.advice.is_empty()
    });
    assert!(filled);
    assert_eq!(
        sources.advice.snapshot().as_deref(),
        Some("теплую куртку, шапку и шарф")
    );

    let stopped_at = Instant::now();
    refreshers.shutdown();
    assert!(stopped_at.elapsed() < Duration::from_secs(2));
}
