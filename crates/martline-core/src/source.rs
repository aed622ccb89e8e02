//! Source transport: HTTP(S) or local file, optionally gzipped.
//!
//! HTTP goes through async reqwest on a shared runtime with a per-chunk
//! stall timeout, but callers get a plain sync `Read`.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::error::EtlError;

/// Timeouts for remote sources.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// No bytes received for this long = stalled download
    pub read_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}

static HTTP_CONFIG: OnceLock<HttpConfig> = OnceLock::new();

/// Set process-wide HTTP settings. Only the first call takes effect.
pub fn set_http_config(config: HttpConfig) {
    if HTTP_CONFIG.set(config).is_err() {
        log::debug!("HTTP config already set, ignoring override");
    }
}

pub fn http_config() -> HttpConfig {
    *HTTP_CONFIG.get_or_init(HttpConfig::default)
}

static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(http_config().connect_timeout)
        .build()
        .expect("failed to build HTTP client")
});

static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Where a source URI points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(String),
    File(PathBuf),
}

impl SourceLocation {
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            Self::Http(uri.to_string())
        } else {
            let path = uri.strip_prefix("file://").unwrap_or(uri);
            Self::File(PathBuf::from(path))
        }
    }

    fn is_gzip(&self) -> bool {
        let path = match self {
            // Ignore query string when checking the suffix
            Self::Http(url) => url.split(['?', '#']).next().unwrap_or(url),
            Self::File(path) => return path.extension().is_some_and(|ext| ext == "gz"),
        };
        path.ends_with(".gz")
    }
}

/// Open a source for reading. Gzipped sources are decompressed transparently.
pub fn open_source(uri: &str) -> Result<Box<dyn Read>, EtlError> {
    let location = SourceLocation::parse(uri);
    let unavailable = |message: String| EtlError::SourceUnavailable {
        uri: uri.to_string(),
        message,
    };

    let reader: Box<dyn Read> = match &location {
        SourceLocation::Http(url) => {
            log::debug!("GET {url}");
            let body = fetch_body(url).map_err(unavailable)?;
            Box::new(Cursor::new(body))
        }
        SourceLocation::File(path) => {
            let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
            Box::new(BufReader::new(file))
        }
    };

    if location.is_gzip() {
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(reader)
    }
}

/// Download a whole response body, failing if any chunk stalls.
fn fetch_body(url: &str) -> Result<Vec<u8>, String> {
    let read_timeout = http_config().read_timeout;
    SHARED_RUNTIME.handle().block_on(async {
        let mut response = SHARED_CLIENT
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| describe_reqwest(&e))?;

        let mut body = Vec::new();
        loop {
            match tokio::time::timeout(read_timeout, response.chunk()).await {
                Ok(Ok(Some(chunk))) => body.extend_from_slice(&chunk),
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(describe_reqwest(&e)),
                Err(_) => {
                    return Err(format!(
                        "read timeout ({}s with no data)",
                        read_timeout.as_secs()
                    ));
                }
            }
        }
        Ok(body)
    })
}

fn describe_reqwest(e: &reqwest::Error) -> String {
    match e.status() {
        Some(status) => format!("HTTP {}: {e}", status.as_u16()),
        None => format!("HTTP error: {e}"),
    }
}
