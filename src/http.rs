use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use crate::refresher::FetchError;

const USER_AGENT: &str = concat!("snowclock/", env!("CARGO_PKG_VERSION"));

/// Refreshers cannot interrupt a request in flight, so every request is bounded by a
/// timeout instead.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
}

/// Anything but `200 OK` counts as a failed fetch.
pub fn expect_ok(response: Response) -> Result<Response, FetchError> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(FetchError::Status {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }
}
