#![allow(dead_code)]

use axum::extract::OriginalUri;
use axum::http::{header, Method, StatusCode};
use axum::routing::any;
use axum::Router;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempcast_bot::config::Settings;
use tokio::net::TcpListener;

/// Address nothing listens on
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9";

/// Path of a channel's latest-entry endpoint
pub fn last_path(channel_id: u64) -> String {
    format!("/channels/{channel_id}/feeds/last.json")
}

/// Path of a channel's feed-history endpoint
pub fn history_path(channel_id: u64) -> String {
    format!("/channels/{channel_id}/feeds.json")
}

/// Canned response for one path
#[derive(Clone)]
pub struct StubRoute {
    path: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// Answer `path` with `status` and a JSON `body`
pub fn route(path: impl Into<String>, status: u16, body: impl Into<String>) -> StubRoute {
    StubRoute {
        path: path.into(),
        status,
        body: body.into(),
        delay: None,
    }
}

impl StubRoute {
    /// Hold the response back for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Local axum server with fixed routes; every other path answers 404.
pub struct StubServer {
    /// Root URL of the stub, e.g. `http://127.0.0.1:40123`
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

fn record(requests: &Mutex<Vec<String>>, method: &Method, uri: &OriginalUri) {
    requests
        .lock()
        .expect("request log lock")
        .push(format!("{method} {}", uri.0));
}

impl StubServer {
    /// Serve `routes` until the test ends.
    pub async fn start(routes: Vec<StubRoute>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut app = Router::new();

        for stub in routes {
            let path = stub.path.clone();
            let log = requests.clone();
            let handler = move |method: Method, uri: OriginalUri| {
                let stub = stub.clone();
                let log = log.clone();
                async move {
                    record(&log, &method, &uri);
                    if let Some(delay) = stub.delay {
                        tokio::time::sleep(delay).await;
                    }
                    let status = StatusCode::from_u16(stub.status).expect("valid status code");
                    (status, [(header::CONTENT_TYPE, "application/json")], stub.body)
                }
            };
            app = app.route(&path, any(handler));
        }

        let log = requests.clone();
        app = app.fallback(move |method: Method, uri: OriginalUri| {
            let log = log.clone();
            async move {
                record(&log, &method, &uri);
                (StatusCode::NOT_FOUND, "not found")
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server runs");
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Number of requests served so far, including 404s
    pub fn hits(&self) -> usize {
        self.requests.lock().expect("request log lock").len()
    }

    /// `METHOD /path?query` of every request seen so far
    pub fn request_lines(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }
}

/// Settings pointing the feeds at `base_url`, with no secrets configured.
pub fn settings_for(base_url: &str) -> Settings {
    serde_json::from_value(json!({
        "telegram_token": "123456:TEST",
        "thingspeak_base_url": base_url,
        "http_timeout_secs": 5,
    }))
    .expect("settings deserialize")
}
