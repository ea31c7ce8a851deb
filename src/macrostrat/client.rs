use reqwest::Url;
use reqwest::blocking::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::ApiError;

/// Where reference records come from. Parameters set to `None` are left out
/// of the request.
pub trait ReferenceSource {
    /// Records from an endpoint that wraps its payload in `success.data`.
    fn fetch_records(
        &self,
        endpoint: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<Vec<Value>, ApiError>;

    /// Raw response body, e.g. a GeoJSON feature collection.
    fn fetch_text(
        &self,
        endpoint: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<String, ApiError>;
}

/// Blocking HTTP client for the Macrostrat API. Every request carries the
/// configured timeout and is never retried.
pub struct MacrostratClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl MacrostratClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Self::with_builder(Client::builder(), base_url, timeout)
    }

    fn with_builder(builder: ClientBuilder, base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = builder
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Request {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str, params: &[(&str, Option<String>)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let present = params
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)));

        Url::parse_with_params(&raw, present).map_err(|e| ApiError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    fn get(&self, url: Url) -> Result<String, ApiError> {
        info!("Fetching {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| self.request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| self.request_error(&url, e))
    }

    fn request_error(&self, url: &Url, source: reqwest::Error) -> ApiError {
        if source.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            ApiError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Pulls the record list out of a `{"success": {"data": [...]}}` envelope.
pub fn unwrap_envelope(url: &str, body: &str) -> Result<Vec<Value>, ApiError> {
    let malformed = |reason: String| ApiError::Malformed {
        url: url.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
        return Err(malformed(format!("API error: {}", message)));
    }

    match value.pointer("/success/data") {
        Some(Value::Array(records)) => Ok(records.clone()),
        Some(_) => Err(malformed("success.data is not a list".to_string())),
        None => Err(malformed("missing success.data".to_string())),
    }
}

impl ReferenceSource for MacrostratClient {
    fn fetch_records(
        &self,
        endpoint: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.url(endpoint, params)?;
        let body = self.get(url.clone())?;
        unwrap_envelope(url.as_str(), &body)
    }

    fn fetch_text(
        &self,
        endpoint: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<String, ApiError> {
        let url = self.url(endpoint, params)?;
        self.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Client for a local test server, bypassing any proxy from the
    /// environment.
    fn local_client(port: u16, timeout: Duration) -> MacrostratClient {
        MacrostratClient::with_builder(
            Client::builder().no_proxy(),
            &format!("http://127.0.0.1:{}/api/v2", port),
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn test_url_drops_missing_params() {
        let client = MacrostratClient::new("https://example.org/api/v2/", Duration::from_secs(5)).unwrap();
        let url = client
            .url(
                "units",
                &[
                    ("strat_name", Some("Bakken Fm".to_string())),
                    ("age_top", None),
                    ("age_bottom", Some("360".to_string())),
                ],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://example.org/api/v2/units?strat_name=Bakken+Fm&age_bottom=360"
        );
    }

    #[test]
    fn test_unwrap_envelope() {
        let body = r#"{"success": {"v": 2, "data": [{"lith_id": 1}, {"lith_id": 2}]}}"#;
        let records = unwrap_envelope("u", body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["lith_id"], 2);

        let err = unwrap_envelope("u", r#"{"error": {"message": "bad param"}}"#).unwrap_err();
        assert!(err.to_string().contains("bad param"));

        assert!(matches!(
            unwrap_envelope("u", "<html>"),
            Err(ApiError::Malformed { .. })
        ));
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept, then hold the connection open without answering
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });

        let client = local_client(port, Duration::from_secs(1));
        let err = client.fetch_records("defs/intervals", &[("name", Some("Famennian".to_string()))]).unwrap_err();
        match err {
            ApiError::Timeout { url, secs } => {
                assert_eq!(secs, 1);
                assert!(url.contains("/api/v2/defs/intervals?name=Famennian"), "{}", url);
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_error_status_carries_url() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let client = local_client(port, Duration::from_secs(5));
        let err = client.fetch_text("columns", &[("project_id", Some("1".to_string()))]).unwrap_err();
        match err {
            ApiError::Status { url, status } => {
                assert_eq!(status, 503);
                assert!(url.ends_with("/api/v2/columns?project_id=1"), "{}", url);
            }
            other => panic!("expected a status error, got {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_refused_connection_carries_url() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = local_client(port, Duration::from_secs(5));
        let err = client.fetch_records("units", &[("strat_name", Some("Bakken".to_string()))]).unwrap_err();
        match err {
            ApiError::Request { url, .. } => assert!(url.contains("units?strat_name=Bakken"), "{}", url),
            other => panic!("expected a request error, got {:?}", other),
        }
    }
}
