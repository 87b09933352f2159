use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::config::Config;

#[derive(Clone, Copy, Debug)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub bypass_proxy: bool,
    pub force_ipv4: bool,
}

impl HttpOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timeout: cfg.http_timeout(),
            bypass_proxy: cfg.bypass_proxy,
            force_ipv4: cfg.force_ipv4,
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// `timeout` bounds the whole exchange, body included.
pub fn build_client(opts: &HttpOptions) -> Result<Client, String> {
    configure(Client::builder().timeout(opts.timeout), opts)
}

/// For event streams: `timeout` bounds only connecting, so a long answer is not cut off
/// midway. A server that stops sending without closing the stream is not detected.
pub fn build_streaming_client(opts: &HttpOptions) -> Result<Client, String> {
    let builder = Client::builder()
        .connect_timeout(opts.timeout)
        .timeout(None::<Duration>);
    configure(builder, opts)
}

fn configure(mut builder: ClientBuilder, opts: &HttpOptions) -> Result<Client, String> {
    if opts.bypass_proxy {
        builder = builder.no_proxy();
    }
    if opts.force_ipv4 {
        builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
    builder.build().map_err(|e| e.to_string())
}

pub fn post_json<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T, String> {
    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .map_err(|e| e.to_string())?;
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(format!("POST {} failed: {} {}", url, status, text));
    }
    from_str::<T>(&text).map_err(|e| format!("POST {} decode failed: {} | {}", url, e, text))
}

/// Sends a JSON body and hands back the open response for incremental reading.
pub fn post_event_stream<B: Serialize>(
    client: &Client,
    url: &str,
    bearer: &str,
    body: &B,
) -> Result<Response, String> {
    let resp = client
        .post(url)
        .bearer_auth(bearer)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "text/event-stream")
        .json(body)
        .send()
        .map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        return Err(format!("POST {} failed: {} {}", url, status, text));
    }
    Ok(resp)
}
