use std::convert::TryFrom;
use std::fmt;

use reqwest::blocking::Client;

use crate::http;
use crate::refresher::{Fetch, FetchError, Update};

/// Current conditions from the open-meteo forecast endpoint.
///
/// ```json
/// {
///     "latitude": 52.366,
///     "longitude": 4.901,
///     "current_weather": {
///         "time": "2025-11-22T09:15",
///         "temperature": -3.4,
///         "windspeed": 4.2,
///         "winddirection": 250,
///         "is_day": 1,
///         "weathercode": 71
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Metres per second.
    pub wind_speed: f64,
    pub condition: WeatherCondition,
}

impl TryFrom<json::JsonValue> for Observation {
    type Error = FetchError;

    fn try_from(mut json: json::JsonValue) -> Result<Self, Self::Error> {
        let mut current = json.remove("current_weather");
        if !current.is_object() {
            return Err(FetchError::Field("current_weather"));
        }

        Ok(Self {
            temperature: current
                .remove("temperature")
                .as_f64()
                .ok_or(FetchError::Field("temperature"))?,
            wind_speed: current
                .remove("windspeed")
                .as_f64()
                .ok_or(FetchError::Field("windspeed"))?,
            condition: current
                .remove("weathercode")
                .as_u16()
                .ok_or(FetchError::Field("weathercode"))?
                .into(),
        })
    }
}

impl Observation {
    /// `-3°C, снежок, ветерок 4 м/с`
    pub fn summary(&self) -> String {
        format!(
            "{:.0}°C, {}, {}",
            self.temperature,
            self.condition,
            wind_text(self.wind_speed)
        )
    }
}

/// What the weather slot holds: the raw observation for the advice source and the
/// rendered line for the clock face.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub observation: Observation,
    pub summary: String,
}

impl From<Observation> for WeatherReport {
    fn from(observation: Observation) -> Self {
        Self {
            summary: observation.summary(),
            observation,
        }
    }
}

pub fn parse(body: &str) -> Result<WeatherReport, FetchError> {
    Observation::try_from(json::parse(body)?).map(WeatherReport::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Light,
    Moderate,
    Heavy,
}

/// WMO weather interpretation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    Drizzle(Intensity),
    FreezingDrizzle(Intensity),
    Rain(Intensity),
    FreezingRain(Intensity),
    Snowfall(Intensity),
    SnowGrains,
    RainShowers(Intensity),
    SnowShowers(Intensity),
    Thunderstorm,
    ThunderstormWithHail(Intensity),
    Unknown(u16),
}

impl From<u16> for WeatherCondition {
    fn from(data: u16) -> Self {
        use Intensity::*;

        match data {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::DepositingRimeFog,
            51 => Self::Drizzle(Light),
            53 => Self::Drizzle(Moderate),
            55 => Self::Drizzle(Heavy),
            56 => Self::FreezingDrizzle(Light),
            57 => Self::FreezingDrizzle(Heavy),
            61 => Self::Rain(Light),
            63 => Self::Rain(Moderate),
            65 => Self::Rain(Heavy),
            66 => Self::FreezingRain(Light),
            67 => Self::FreezingRain(Heavy),
            71 => Self::Snowfall(Light),
            73 => Self::Snowfall(Moderate),
            75 => Self::Snowfall(Heavy),
            77 => Self::SnowGrains,
            80 => Self::RainShowers(Light),
            81 => Self::RainShowers(Moderate),
            82 => Self::RainShowers(Heavy),
            85 => Self::SnowShowers(Light),
            86 => Self::SnowShowers(Heavy),
            95 => Self::Thunderstorm,
            96 => Self::ThunderstormWithHail(Light),
            99 => Self::ThunderstormWithHail(Heavy),
            _ => Self::Unknown(data),
        }
    }
}

impl WeatherCondition {
    pub fn description(&self) -> &'static str {
        use Intensity::*;

        match self {
            Self::ClearSky => "ясно",
            Self::MainlyClear => "редкие облака",
            Self::PartlyCloudy => "переменная облачность",
            Self::Overcast => "облачно",
            Self::Fog => "туман",
            Self::DepositingRimeFog => "изморозь",
            Self::Drizzle(Light) => "легкая морось",
            Self::Drizzle(Moderate) => "моросит",
            Self::Drizzle(Heavy) => "плотно моросит",
            Self::FreezingDrizzle(Heavy) => "тяжелая ледяная морось",
            Self::FreezingDrizzle(_) => "ледяная морось",
            Self::Rain(Light) => "легкий дождик",
            Self::Rain(Moderate) => "дождь",
            Self::Rain(Heavy) => "ливень",
            Self::FreezingRain(Heavy) => "ледяной ливень",
            Self::FreezingRain(_) => "холодный дождь",
            Self::Snowfall(Light) => "снежок",
            Self::Snowfall(Moderate) => "снегопад",
            Self::Snowfall(Heavy) => "сильный снегопад",
            Self::SnowGrains => "снежный град",
            Self::RainShowers(Light) => "ливневый дождик",
            Self::RainShowers(Moderate) => "ливни",
            Self::RainShowers(Heavy) => "плотные ливни",
            Self::SnowShowers(Heavy) => "снежные дожди",
            Self::SnowShowers(_) => "снежный дождик",
            Self::Thunderstorm => "небольшая гроза",
            Self::ThunderstormWithHail(Heavy) => "град с грозой",
            Self::ThunderstormWithHail(_) => "гроза с маленьким градом",
            Self::Unknown(_) => "Неизвестно",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindClass {
    Calm,
    Breeze,
    Wind,
    StrongWind,
    Squall,
    Hurricane,
}

impl From<f64> for WindClass {
    /// Speed in metres per second.
    fn from(speed: f64) -> Self {
        if speed < 1.0 {
            Self::Calm
        } else if speed <= 5.0 {
            Self::Breeze
        } else if speed <= 10.0 {
            Self::Wind
        } else if speed <= 15.0 {
            Self::StrongWind
        } else if speed <= 20.0 {
            Self::Squall
        } else {
            Self::Hurricane
        }
    }
}

impl fmt::Display for WindClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Calm => "штиль",
            Self::Breeze => "ветерок",
            Self::Wind => "ветер",
            Self::StrongWind => "сильный ветер",
            Self::Squall => "шквальный ветер",
            Self::Hurricane => "ураган",
        })
    }
}

pub fn wind_text(speed: f64) -> String {
    let class = WindClass::from(speed);
    if speed >= 1.0 {
        format!("{} {:.0} м/с", class, speed)
    } else {
        class.to_string()
    }
}

pub struct WeatherSource {
    client: Client,
    url: String,
    latitude: f64,
    longitude: f64,
}

impl WeatherSource {
    pub fn new(client: Client, url: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            client,
            url: url.into(),
            latitude,
            longitude,
        }
    }
}

impl Fetch for WeatherSource {
    type Output = WeatherReport;

    fn fetch(&mut self) -> Result<Update<WeatherReport>, FetchError> {
        let latitude = self.latitude.to_string();
        let longitude = self.longitude.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current_weather", "true"),
                ("windspeed_unit", "ms"),
                ("timezone", "auto"),
            ])
            .send()?;

        let body = http::expect_ok(response)?.text()?;
        parse(&body).map(Update::Fresh)
    }
}
