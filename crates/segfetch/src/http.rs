use std::time::Duration;

use reqwest::{header::ACCEPT, Client, ClientBuilder, Response};
use url::Url;

use crate::{SegfetchError, SegfetchResult};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// HTTP client shared by every flow.
///
/// Requests go through [`HttpClient::fetch`], which turns non-success responses into
/// [`SegfetchError::HttpError`] and retries failed requests up to `retries` times.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> reqwest::Result<Self> {
        Ok(Self {
            client: builder.build()?,
            retries: 0,
        })
    }

    /// Retries each failed request up to `retries` times, doubling the delay between attempts.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub async fn fetch(&self, url: &Url) -> SegfetchResult<Response> {
        self.send(url, None).await
    }

    pub async fn fetch_text(&self, url: &Url, accept: &str) -> SegfetchResult<String> {
        let response = self.send(url, Some(accept)).await?;
        response
            .text()
            .await
            .map_err(|source| SegfetchError::RequestError {
                url: url.clone(),
                source,
            })
    }

    async fn send(&self, url: &Url, accept: Option<&str>) -> SegfetchResult<Response> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.get(url.clone());
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if let Ok(body) = response.text().await {
                        tracing::debug!("Error body: {body}");
                    }
                    SegfetchError::HttpError {
                        url: url.clone(),
                        status,
                    }
                }
                Err(source) => SegfetchError::RequestError {
                    url: url.clone(),
                    source,
                },
            };

            if attempt >= self.retries {
                return Err(error);
            }

            let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                retries = self.retries,
                "{error}, retry in {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
            retries: 0,
        }
    }
}
