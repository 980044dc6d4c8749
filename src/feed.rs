use std::convert::TryFrom;
use std::sync::Arc;

use image::RgbaImage;
use log::info;
use reqwest::blocking::Client;

use crate::clock::{self, LocalClock};
use crate::http;
use crate::refresher::{Fetch, FetchError, Update};

/// One item of the image feed. Only the fields the clock uses are kept.
///
/// ```json
/// {
///     "title": "Sample Location 1",
///     "copyright": "© Sample/Getty Image",
///     "fullUrl": "https://img.peapix.com/0123abcd_1920.jpg",
///     "thumbUrl": "https://img.peapix.com/0123abcd_640.jpg",
///     "imageUrl": "https://img.peapix.com/0123abcd.jpg",
///     "pageUrl": "https://peapix.com/bing/54000",
///     "date": "2025-11-22"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub full_url: String,
    pub date: String,
}

impl TryFrom<json::JsonValue> for FeedEntry {
    type Error = FetchError;

    fn try_from(mut json: json::JsonValue) -> Result<Self, Self::Error> {
        Ok(Self {
            full_url: json
                .remove("fullUrl")
                .as_str()
                .ok_or(FetchError::Field("fullUrl"))?
                .to_owned(),
            date: json
                .remove("date")
                .as_str()
                .ok_or(FetchError::Field("date"))?
                .to_owned(),
        })
    }
}

pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let mut json = json::parse(body)?;
    if !json.is_array() {
        return Err(FetchError::Field("feed"));
    }

    let entries = json
        .members_mut()
        .map(|e| FeedEntry::try_from(e.take()))
        .collect::<Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        Err(FetchError::EmptyFeed)
    } else {
        Ok(entries)
    }
}

/// Today's picture if the feed has one, the newest entry otherwise.
pub fn pick_entry<'a>(entries: &'a [FeedEntry], today: &str) -> Option<&'a FeedEntry> {
    entries
        .iter()
        .find(|e| e.date == today)
        .or_else(|| entries.first())
}

/// A decoded background photo, ready to be turned into a texture.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pub url: String,
    pub date: String,
    pub pixels: RgbaImage,
}

pub fn decode(entry: &FeedEntry, bytes: &[u8]) -> Result<BackgroundImage, FetchError> {
    Ok(BackgroundImage {
        url: entry.full_url.clone(),
        date: entry.date.clone(),
        pixels: image::load_from_memory(bytes)?.to_rgba8(),
    })
}

pub struct ImageFeed {
    client: Client,
    feed_url: String,
    clock: LocalClock,
    last_url: Option<String>,
}

impl ImageFeed {
    pub fn new(client: Client, feed_url: impl Into<String>, clock: LocalClock) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
            clock,
            last_url: None,
        }
    }

    /// URL of the last image that was downloaded and decoded.
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = http::expect_ok(self.client.get(url).send()?)?;
        Ok(response.bytes()?.to_vec())
    }
}

impl Fetch for ImageFeed {
    type Output = Arc<BackgroundImage>;

    fn fetch(&mut self) -> Result<Update<Arc<BackgroundImage>>, FetchError> {
        let body = http::expect_ok(self.client.get(&self.feed_url).send()?)?.text()?;
        let entries = parse_feed(&body)?;
        let today = clock::iso_date(&self.clock.now());
        let entry = pick_entry(&entries, &today).ok_or(FetchError::EmptyFeed)?;

        if self.last_url.as_deref() == Some(entry.full_url.as_str()) {
            return Ok(Update::Unchanged);
        }

        let image = decode(entry, &self.download(&entry.full_url)?)?;
        info!(
            "Loaded background {} ({}x{}) from {}",
            image.url,
            image.pixels.width(),
            image.pixels.height(),
            image.date
        );
        self.last_url = Some(entry.full_url.clone());

        Ok(Update::Fresh(Arc::new(image)))
    }
}
