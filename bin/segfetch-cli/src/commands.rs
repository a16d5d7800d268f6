use std::{str::FromStr, time::Duration};

use anyhow::Context;
use clap::{Args, Subcommand};
use clap_handler::Handler;
use fake_user_agent::get_chrome_rua;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use segfetch::HttpClient;

mod dash;
mod mirror;

#[derive(Subcommand, Clone, Handler)]
pub enum SegfetchCommand {
    Dash(dash::DashCommand),
    Mirror(mirror::MirrorCommand),
}

#[derive(Args, Clone, Debug, Default)]
pub struct HttpOptions {
    /// Additional HTTP headers, eg. "Referer: https://example.com"
    #[clap(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// HTTP timeout, in seconds. No timeout by default
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Retry limit of each request
    #[clap(long, default_value = "0")]
    pub retries: u32,
}

impl HttpOptions {
    pub fn into_client(self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header: {header}"))?;
            headers.insert(
                HeaderName::from_str(key.trim())
                    .with_context(|| format!("Invalid header name: {key}"))?,
                HeaderValue::from_str(value.trim())
                    .with_context(|| format!("Invalid header value: {value}"))?,
            );
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(get_chrome_rua());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(HttpClient::new(builder)?.with_retries(self.retries))
    }
}
