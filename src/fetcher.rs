use crate::{Fetcher, Result, ScraperError};
use reqwest::{
    header::{
        HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, UPGRADE_INSECURE_REQUESTS,
    },
    Client, StatusCode,
};
use tokio::{
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL the body was served from, after redirects.
    pub url: String,
    /// Undecoded response body.
    pub body: Vec<u8>,
    /// Charset named by the Content-Type header.
    pub charset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Minimum interval between the start of two requests.
    pub delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Wait before the first retry, doubled on each further retry.
    pub backoff: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff: Duration::from_secs(1),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
    last_request: Mutex<Option<Instant>>,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3"),
        );
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(HttpFetcher {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    async fn wait_turn(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = last_request.take() {
            let elapsed = last.elapsed();
            if elapsed < self.config.delay {
                tokio::time::sleep(self.config.delay - elapsed).await;
            }
        }
        last_request.replace(Instant::now());
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        let mut attempt = 0;
        loop {
            self.wait_turn().await;
            debug!("Visit {}", url);

            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    let final_url = response.url().to_string();
                    let charset = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .and_then(content_type_charset);
                    let body = response.bytes().await?.to_vec();
                    return Ok(Page {
                        url: final_url,
                        body,
                        charset,
                    });
                }
                Ok(response) if is_retryable(response.status()) && attempt < self.config.max_retries => {
                    warn!(
                        "Status {} from {}, retry {}/{}",
                        response.status(),
                        url,
                        attempt + 1,
                        self.config.max_retries
                    );
                }
                Ok(response) => {
                    return Err(ScraperError::HttpStatus {
                        status: response.status().as_u16(),
                        url: url.to_string(),
                    })
                }
                Err(e) if is_transient(&e) && attempt < self.config.max_retries => {
                    warn!(
                        "Request to {} failed ({}), retry {}/{}",
                        url,
                        e,
                        attempt + 1,
                        self.config.max_retries
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.config.backoff_for(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

fn content_type_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
