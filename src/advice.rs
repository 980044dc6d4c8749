//! Clothing advice from an OpenAI-compatible chat completion endpoint, with a
//! temperature table for when the model cannot be reached.

use std::sync::Arc;

use log::warn;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::clock::{self, LocalClock};
use crate::refresher::{Fetch, FetchError, Update};
use crate::slot::SharedSlot;
use crate::weather::{Observation, WeatherReport};

const SYSTEM_PROMPT: &str = "You are a helpful assistant providing concise clothing advice.";
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.7;

pub fn basic_advice(temperature: f64) -> &'static str {
    if temperature < -10.0 {
        "Наденьте теплую зимнюю куртку, шапку, шарф и теплые ботинки."
    } else if temperature < 0.0 {
        "Наденьте зимнюю куртку и теплые аксессуары."
    } else if temperature < 10.0 {
        "Наденьте куртку и шапку."
    } else if temperature < 20.0 {
        "Наденьте легкую куртку или свитер."
    } else {
        "Наденьте легкую одежду."
    }
}

/// Models like to quote their one-liners.
pub fn strip_quotes(text: &str) -> &str {
    if text.len() > 1 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

pub fn prompt(city: &str, date: &str, time: &str, observation: &Observation) -> String {
    format!(
        "I live in {}. Today is {}, the time is {} and the weather is: {} ({:.0}C). \
         What should I wear? Please answer in one short sentence, in russian. \
         Only say what clothes I should wear, there's no need to mention city, current weather or time and date. \
         Basically, just continue the phrase: You should wear..., without saying the 'you should wear' part.",
        city, date, time, observation.condition, observation.temperature
    )
}

pub fn chat_payload(model: &str, prompt: &str) -> json::JsonValue {
    let mut system = json::JsonValue::new_object();
    system["role"] = "system".into();
    system["content"] = SYSTEM_PROMPT.into();

    let mut user = json::JsonValue::new_object();
    user["role"] = "user".into();
    user["content"] = prompt.into();

    let mut payload = json::JsonValue::new_object();
    payload["model"] = model.into();
    payload["max_tokens"] = MAX_TOKENS.into();
    payload["temperature"] = TEMPERATURE.into();
    payload["messages"] = json::JsonValue::Array(vec![system, user]);
    payload
}

/// The first choice's message, or `None` when the model returned no choices.
///
/// ```json
/// {
///     "id": "chatcmpl-123",
///     "choices": [{
///         "index": 0,
///         "message": {"role": "assistant", "content": "теплую куртку и шапку"},
///         "finish_reason": "stop"
///     }]
/// }
/// ```
pub fn parse_reply(body: &str) -> Result<Option<String>, FetchError> {
    let mut json = json::parse(body)?;
    let mut choices = json.remove("choices");
    if !choices.is_array() {
        return Err(FetchError::Field("choices"));
    }

    match choices.members_mut().next() {
        None => Ok(None),
        Some(choice) => {
            let content = choice["message"]["content"]
                .as_str()
                .ok_or(FetchError::Field("message.content"))?;
            Ok(Some(strip_quotes(content.trim()).to_owned()))
        }
    }
}

pub struct LlmSettings {
    pub url: String,
    pub model: String,
    /// `None` means the fallback table is always used.
    pub api_key: Option<String>,
    pub city: String,
}

pub struct AdviceSource {
    client: Client,
    settings: LlmSettings,
    clock: LocalClock,
    weather: Arc<SharedSlot<WeatherReport>>,
    advised: Option<Observation>,
}

impl AdviceSource {
    pub fn new(
        client: Client,
        settings: LlmSettings,
        clock: LocalClock,
        weather: Arc<SharedSlot<WeatherReport>>,
    ) -> Self {
        Self {
            client,
            settings,
            clock,
            weather,
            advised: None,
        }
    }

    fn ask(&self, api_key: &str, observation: &Observation) -> Result<Option<String>, FetchError> {
        let now = self.clock.now();
        let prompt = prompt(
            &self.settings.city,
            &clock::date_text(&now),
            &clock::time_text(&now),
            observation,
        );

        let response = self
            .client
            .post(&self.settings.url)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(chat_payload(&self.settings.model, &prompt).dump())
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            // The caller logs the error, body included.
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_owned(),
            });
        }
        parse_reply(&response.text()?)
    }
}

impl Fetch for AdviceSource {
    type Output = String;

    fn fetch(&mut self) -> Result<Update<String>, FetchError> {
        let report = match self.weather.snapshot() {
            Some(report) => report,
            None => return Ok(Update::Pending),
        };
        let observation = report.observation;

        if self.advised == Some(observation) {
            return Ok(Update::Unchanged);
        }

        let fallback = || basic_advice(observation.temperature).to_owned();
        let advice = match self.settings.api_key.as_deref() {
            None => {
                self.advised = Some(observation);
                fallback()
            }
            Some(key) => match self.ask(key, &observation) {
                Ok(Some(text)) if !text.is_empty() => {
                    self.advised = Some(observation);
                    text
                }
                Ok(_) => {
                    warn!("LLM reply had no advice, using the fallback table");
                    fallback()
                }
                Err(e) => {
                    warn!("LLM request failed ({}), using the fallback table", e);
                    fallback()
                }
            },
        };

        Ok(Update::Fresh(advice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherCondition;

    #[test]
    fn fallback_table() {
        assert_eq!(
            basic_advice(-15.0),
            "Наденьте теплую зимнюю куртку, шапку, шарф и теплые ботинки."
        );
        assert_eq!(basic_advice(-10.0), "Наденьте зимнюю куртку и теплые аксессуары.");
        assert_eq!(basic_advice(0.0), "Наденьте куртку и шапку.");
        assert_eq!(basic_advice(15.0), "Наденьте легкую куртку или свитер.");
        assert_eq!(basic_advice(20.0), "Наденьте легкую одежду.");
    }

    #[test]
    fn strips_only_surrounding_quotes() {
        assert_eq!(strip_quotes("\"пальто\""), "пальто");
        assert_eq!(strip_quotes("пальто"), "пальто");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"пальто"), "\"пальто");
    }

    #[test]
    fn payload_shape() {
        let payload = chat_payload("openai/gpt-oss-120b", "what to wear");
        assert_eq!(payload["model"], "openai/gpt-oss-120b");
        assert_eq!(payload["max_tokens"], 300);
        assert_eq!(payload["messages"].len(), 2);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "what to wear");
    }

    #[test]
    fn prompt_mentions_weather() {
        let observation = Observation {
            temperature: -3.4,
            wind_speed: 4.2,
            condition: WeatherCondition::from(71),
        };
        let text = prompt("Amsterdam", "пятница, 16 октября 2026 года", "9:15", &observation);
        assert!(text.starts_with("I live in Amsterdam. Today is пятница, 16 октября 2026 года, the time is 9:15"));
        assert!(text.contains("снежок (-3C)"));
    }

    #[test]
    fn reply_parsing() {
        let body = r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "\"теплую куртку\""}, "finish_reason": "stop"}]}"#;
        assert_eq!(parse_reply(body).unwrap().as_deref(), Some("теплую куртку"));

        assert_eq!(parse_reply(r#"{"id": "x", "choices": []}"#).unwrap(), None);
        assert!(matches!(
            parse_reply(r#"{"error": "rate limited"}"#),
            Err(FetchError::Field("choices"))
        ));
    }

    fn offline_source(weather: Arc<SharedSlot<WeatherReport>>) -> AdviceSource {
        AdviceSource::new(
            Client::new(),
            LlmSettings {
                url: "http://127.0.0.1:9/unused".to_string(),
                model: "test".to_string(),
                api_key: None,
                city: "Amsterdam".to_string(),
            },
            LocalClock,
            weather,
        )
    }

    #[test]
    fn pending_until_weather_arrives() {
        let weather = Arc::new(SharedSlot::new());
        let mut source = offline_source(weather.clone());
        assert_eq!(source.fetch().unwrap(), Update::Pending);

        weather.publish(WeatherReport::from(Observation {
            temperature: 5.0,
            wind_speed: 2.0,
            condition: WeatherCondition::Overcast,
        }));
        assert_eq!(
            source.fetch().unwrap(),
            Update::Fresh("Наденьте куртку и шапку.".to_string())
        );
        assert_eq!(source.fetch().unwrap(), Update::Unchanged);
    }

    #[test]
    fn rejected_reply_carries_the_body() {
        let server = crate::mock::MockServer::spawn(false).unwrap();
        let mut source = offline_source(Arc::new(SharedSlot::new()));
        source.settings.url = server.url("/missing");

        let observation = Observation {
            temperature: 5.0,
            wind_speed: 2.0,
            condition: WeatherCondition::Overcast,
        };
        match source.ask("test-key", &observation) {
            Err(FetchError::Rejected { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("expected a rejected request, got {:?}", other),
        }
    }
}
