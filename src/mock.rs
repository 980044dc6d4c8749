//! A local stand-in for the three remote endpoints, for development without network
//! access and for tests.
//!
//! - `GET /bing/feed`: five feed items dated today and the four days before
//! - `GET /<hash>_1920.jpg`: a 1024x600 JPEG in a colour derived from the hash
//! - `GET /v1/forecast`: fixed current weather
//! - `POST /openai/v1/chat/completions`: a fixed reply, 401 without a bearer token

use std::io::{self, Cursor};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use log::{debug, error, warn};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::clock;

pub const IMAGE_WIDTH: u32 = 1024;
pub const IMAGE_HEIGHT: u32 = 600;
const FEED_ITEMS: usize = 5;

pub const FORECAST_TEMPERATURE: f64 = -3.4;
pub const FORECAST_WINDSPEED: f64 = 4.2;
pub const FORECAST_WEATHERCODE: u16 = 71;
pub const CHAT_REPLY: &str = "\"теплую куртку, шапку и шарф\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn json(value: json::JsonValue) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.dump().into_bytes(),
        }
    }

    fn text(status: u16, text: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: text.as_bytes().to_vec(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            401 => "Unauthorized",
            404 => "Not Found",
            _ => "Internal Server Error",
        }
    }
}

pub struct Routes {
    /// Fixed hashes for the feed, or `None` to draw new ones on every request.
    hashes: Option<Vec<String>>,
}

impl Routes {
    pub fn new(rotate: bool) -> Self {
        Self {
            hashes: if rotate { None } else { Some(random_hashes()) },
        }
    }

    pub fn respond(&self, request: &Request, fallback_origin: &str) -> Response {
        let origin = request
            .host
            .as_ref()
            .map(|host| format!("http://{}", host))
            .unwrap_or_else(|| fallback_origin.to_string());

        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/bing/feed") => self.feed(&origin),
            ("GET", "/v1/forecast") => Response::json(forecast()),
            ("POST", "/openai/v1/chat/completions") => match &request.authorization {
                Some(auth) if auth.starts_with("Bearer ") => Response::json(chat_reply()),
                _ => Response::text(401, "Unauthorized"),
            },
            ("GET", path) if path.starts_with('/') && path.ends_with(".jpg") => {
                let name = &path[1..path.len() - 4];
                let hash = name.split('_').next().unwrap_or(name);
                match jpeg(hash) {
                    Ok(body) => Response {
                        status: 200,
                        content_type: "image/jpeg",
                        body,
                    },
                    Err(e) => Response::text(500, &e.to_string()),
                }
            }
            _ => Response::text(404, "Not Found"),
        }
    }

    fn feed(&self, origin: &str) -> Response {
        let hashes = self.hashes.clone().unwrap_or_else(random_hashes);
        let today = chrono::Local::now().date_naive();

        let items = hashes
            .iter()
            .enumerate()
            .map(|(i, hash)| {
                let mut item = json::JsonValue::new_object();
                item["title"] = format!("Sample Location {}", i + 1).into();
                item["copyright"] = "\u{a9} Sample/Getty Image".into();
                item["fullUrl"] = format!("{}/{}_1920.jpg", origin, hash).into();
                item["thumbUrl"] = format!("{}/{}_640.jpg", origin, hash).into();
                item["imageUrl"] = format!("{}/{}.jpg", origin, hash).into();
                item["pageUrl"] = format!("https://peapix.com/bing/{}", 54000 + i).into();
                item["date"] = clock::iso_date(&(today - chrono::Days::new(i as u64))).into();
                item
            })
            .collect();

        Response::json(json::JsonValue::Array(items))
    }
}

fn random_hashes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..FEED_ITEMS)
        .map(|_| {
            (0..32)
                .map(|_| format!("{:x}", rng.gen_range(0..16u8)))
                .collect::<String>()
        })
        .collect()
}

fn forecast() -> json::JsonValue {
    let mut current = json::JsonValue::new_object();
    current["time"] = "2025-11-22T09:15".into();
    current["temperature"] = FORECAST_TEMPERATURE.into();
    current["windspeed"] = FORECAST_WINDSPEED.into();
    current["winddirection"] = 250.into();
    current["is_day"] = 1.into();
    current["weathercode"] = FORECAST_WEATHERCODE.into();

    let mut body = json::JsonValue::new_object();
    body["latitude"] = 52.366.into();
    body["longitude"] = 4.901.into();
    body["current_weather"] = current;
    body
}

fn chat_reply() -> json::JsonValue {
    let mut message = json::JsonValue::new_object();
    message["role"] = "assistant".into();
    message["content"] = CHAT_REPLY.into();

    let mut choice = json::JsonValue::new_object();
    choice["index"] = 0.into();
    choice["message"] = message;
    choice["finish_reason"] = "stop".into();

    let mut body = json::JsonValue::new_object();
    body["id"] = "chatcmpl-mock".into();
    body["choices"] = json::JsonValue::Array(vec![choice]);
    body
}

/// Hue from the byte sum of the hash, as `hsl(hue, 70%, 60%)`.
pub fn hash_color(hash: &str) -> [u8; 3] {
    let sum: u32 = hash.bytes().map(u32::from).sum();
    hsl_to_rgb((sum % 360) as f64, 0.7, 0.6)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [u8; 3] {
    let chroma = (1. - (2. * lightness - 1.).abs()) * saturation;
    let sector = hue / 60.;
    let x = chroma * (1. - (sector % 2. - 1.).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.),
        1 => (x, chroma, 0.),
        2 => (0., chroma, x),
        3 => (0., x, chroma),
        4 => (x, 0., chroma),
        _ => (chroma, 0., x),
    };
    let m = lightness - chroma / 2.;
    let channel = |v: f64| ((v + m) * 255.).round().clamp(0., 255.) as u8;
    [channel(r), channel(g), channel(b)]
}

fn jpeg(hash: &str) -> image::ImageResult<Vec<u8>> {
    let image = image::RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, image::Rgb(hash_color(hash)));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)?;
    Ok(bytes)
}

async fn read_request(reader: &mut BufReader<TcpStream>) -> io::Result<Option<Request>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/").to_string();

    let mut host = None;
    let mut authorization = None;
    let mut content_length = 0;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "host" => host = Some(value),
                "authorization" => authorization = Some(value),
                "content-length" => content_length = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Some(Request {
        method,
        path,
        host,
        authorization,
        body,
    }))
}

async fn handle(stream: TcpStream, routes: Arc<Routes>, origin: Arc<String>) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let request = match read_request(&mut reader).await? {
        Some(request) => request,
        None => return Ok(()),
    };

    let response = routes.respond(&request, &origin);
    debug!(
        "{} {} -> {} ({} bytes)",
        request.method,
        request.path,
        response.status,
        response.body.len()
    );

    let mut stream = reader.into_inner();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.reason(),
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, routes: Routes) -> io::Result<()> {
    let origin = Arc::new(format!("http://{}", listener.local_addr()?));
    let routes = Arc::new(routes);

    loop {
        let (stream, peer) = listener.accept().await?;
        let routes = routes.clone();
        let origin = origin.clone();
        tokio::spawn(async move {
            if let Err(e) = handle(stream, routes, origin).await {
                warn!("mock: connection from {} failed: {}", peer, e);
            }
        });
    }
}

/// A mock server on an ephemeral local port, running on its own runtime thread for the
/// rest of the process.
pub struct MockServer {
    addr: SocketAddr,
}

impl MockServer {
    pub fn spawn(rotate: bool) -> io::Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_io()
            .build()?;

        thread::Builder::new()
            .name("feed-mock".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let result = match TcpListener::from_std(listener) {
                        Ok(listener) => serve(listener, Routes::new(rotate)).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        error!("mock: server stopped: {}", e);
                    }
                })
            })?;

        Ok(Self { addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn feed_url(&self) -> String {
        self.url("/bing/feed")
    }

    pub fn weather_url(&self) -> String {
        self.url("/v1/forecast")
    }

    pub fn llm_url(&self) -> String {
        self.url("/openai/v1/chat/completions")
    }
}
