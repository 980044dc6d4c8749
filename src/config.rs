use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`, loaded by `main`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub latitude: f64,
    pub longitude: f64,
    /// City named in the advice prompt.
    pub city: String,
    pub image_feed_url: String,
    pub weather_url: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub image_interval: Duration,
    pub weather_interval: Duration,
    pub advice_interval: Duration,
    pub snowflakes: usize,
    pub frame_interval: Duration,
    pub max_frames: Option<u64>,
    /// Only used by the cairo display.
    pub frame_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latitude: 52.3738,
            longitude: 4.8910,
            city: "Amsterdam".to_string(),
            image_feed_url: "https://peapix.com/bing/feed?country=us".to_string(),
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            llm_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            llm_model: "openai/gpt-oss-120b".to_string(),
            llm_api_key: None,
            image_interval: Duration::from_secs(4 * 60 * 60),
            weather_interval: Duration::from_secs(5 * 60),
            advice_interval: Duration::from_secs(5 * 60),
            snowflakes: 666,
            frame_interval: Duration::from_millis(16),
            max_frames: None,
            frame_path: PathBuf::from("frame.png"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. Unset or blank keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            latitude: parsed(&get, "CLOCK_LATITUDE")?.unwrap_or(defaults.latitude),
            longitude: parsed(&get, "CLOCK_LONGITUDE")?.unwrap_or(defaults.longitude),
            city: get("CLOCK_CITY").unwrap_or(defaults.city),
            image_feed_url: get("CLOCK_IMAGE_FEED_URL").unwrap_or(defaults.image_feed_url),
            weather_url: get("CLOCK_WEATHER_URL").unwrap_or(defaults.weather_url),
            llm_url: get("CLOCK_LLM_URL").unwrap_or(defaults.llm_url),
            llm_model: get("CLOCK_LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_api_key: get("CLOCK_LLM_API_KEY").filter(|key| key != "MISSING_KEY"),
            image_interval: interval(&get, "CLOCK_IMAGE_INTERVAL_SECS")?
                .unwrap_or(defaults.image_interval),
            weather_interval: interval(&get, "CLOCK_WEATHER_INTERVAL_SECS")?
                .unwrap_or(defaults.weather_interval),
            advice_interval: interval(&get, "CLOCK_ADVICE_INTERVAL_SECS")?
                .unwrap_or(defaults.advice_interval),
            snowflakes: parsed(&get, "CLOCK_SNOWFLAKES")?.unwrap_or(defaults.snowflakes),
            frame_interval: parsed(&get, "CLOCK_FRAME_MILLIS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.frame_interval),
            max_frames: parsed(&get, "CLOCK_MAX_FRAMES")?,
            frame_path: get("CLOCK_FRAME_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.frame_path),
        })
    }
}

fn parsed<T, F>(get: F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// A refresh interval in whole seconds. Zero would make a refresher poll without pause.
fn interval<F>(get: F, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed::<u64, _>(&get, key)? {
        Some(0) => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}
