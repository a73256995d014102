use crate::config::Config;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::io::{BufRead, BufReader};
use thiserror::Error;

pub const COMMAND_PATH: &str = "/led_command";
pub const USER_COUNT_PATH: &str = "/user_count";
pub const CLEAR_LOG_PATH: &str = "/clear_log";
pub const FULL_LOG_PATH: &str = "/get_full_log";
pub const STREAM_PATH: &str = "/stream_logs";

const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} answered with status {status}")]
    Status { path: String, status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type EventReader = Box<dyn BufRead + Send>;

/// Blocking HTTP seam between the panel and the server.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str, query: Option<&str>) -> Result<Reply, TransportError>;

    fn open_stream(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> Result<EventReader, TransportError>;
}

pub struct HttpTransport {
    base_url: String,
    client: Client,
    stream_client: Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = Client::builder().build().map_err(TransportError::Client)?;
        // The push stream stays open for the whole session.
        let stream_client = Client::builder()
            .timeout(None)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            base_url: config.server_url.as_str().to_string(),
            client,
            stream_client,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: Option<&str>) -> Result<Reply, TransportError> {
        let http_error = |source| TransportError::Http {
            path: path.to_string(),
            source,
        };

        let response = self
            .client
            .get(endpoint_url(&self.base_url, path, query))
            .send()
            .map_err(http_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(http_error)?;

        Ok(Reply { status, body })
    }

    fn open_stream(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> Result<EventReader, TransportError> {
        let mut request = self
            .stream_client
            .get(endpoint_url(&self.base_url, path, None))
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        if let Some(id) = last_event_id {
            request = request.header(LAST_EVENT_ID_HEADER, id);
        }

        let response = request.send().map_err(|source| TransportError::Http {
            path: path.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(Box::new(BufReader::new(response)))
    }
}

fn endpoint_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');

    match query {
        Some(query) if !query.is_empty() => format!("{base}{path}?{query}"),
        _ => format!("{base}{path}"),
    }
}
