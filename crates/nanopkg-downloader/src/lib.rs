//! HTTP(S) fetch backend for the download cache (spec §4.5, §12).
//!
//! Handles `http(s)://` URLs only; `file:` URLs are the download cache's
//! own concern (hard-link/copy, spec §4.5) and never reach this crate.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use nanopkg_config::ProxyConfig;
use nanopkg_core::{Error, Result};
use tokio::sync::Semaphore;
use url::Url;

/// An HTTP(S) fetch backend: a `reqwest::Client` configured with explicit
/// proxies (spec §4.5 "Proxy environment variables ... are exported to the
/// backend per configuration"), retried with exponential backoff, and
/// bounded to `download_max_concurrency` concurrent requests (spec §5).
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    max_retries: usize,
}

impl Downloader {
    /// Build a downloader from the proxy settings and concurrency/retry
    /// limits carried by [`nanopkg_config::Config`].
    ///
    /// # Errors
    /// Returns a `ConfigError` if the underlying `reqwest::Client` cannot
    /// be constructed (e.g. a malformed proxy URL).
    pub fn new(proxy: &ProxyConfig, max_concurrency: usize, max_retries: usize) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(format!(
            "nanopkg/{}",
            env!("CARGO_PKG_VERSION")
        ));

        let no_proxy = proxy.no_proxy.as_deref().and_then(reqwest::NoProxy::from_string);
        if let Some(http) = &proxy.http_proxy {
            let mut p = reqwest::Proxy::http(http)
                .map_err(|e| Error::config(format!("invalid http_proxy '{http}': {e}")))?;
            if let Some(no_proxy) = no_proxy.clone() {
                p = p.no_proxy(no_proxy);
            }
            builder = builder.proxy(p);
        }
        if let Some(https) = &proxy.https_proxy {
            let mut p = reqwest::Proxy::https(https)
                .map_err(|e| Error::config(format!("invalid https_proxy '{https}': {e}")))?;
            if let Some(no_proxy) = no_proxy.clone() {
                p = p.no_proxy(no_proxy);
            }
            builder = builder.proxy(p);
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        // Also export into the process environment for any maintainer
        // script or intercepted utility that shells out to wget/curl
        // (spec §4.5, §6).
        export_proxy_env(proxy);

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            max_retries: max_retries.max(1),
        })
    }

    /// Fetch `url`'s full body, retrying up to the configured
    /// `max_retries` with exponential backoff; each failed attempt logs a
    /// `tracing::warn` (spec §7 `NetworkError`).
    pub async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");

        let url = url.clone();
        let client = self.client.clone();
        let attempts = self.max_retries;
        let mut attempt = 0usize;

        (|| {
            let client = client.clone();
            let url = url.clone();
            async move { fetch_once(&client, &url).await }
        })
        .retry(
            ExponentialBuilder::default()
                .with_max_times(attempts)
                .with_min_delay(Duration::from_millis(200))
                .with_max_delay(Duration::from_secs(10)),
        )
        .notify(|err: &Error, dur: Duration| {
            attempt += 1;
            tracing::warn!(url = %url, attempt, delay = ?dur, error = %err, "fetch attempt failed, retrying");
        })
        .await
    }
}

async fn fetch_once(client: &reqwest::Client, url: &Url) -> Result<Bytes> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::network(url.as_str(), e.to_string()))?;
    let response = response
        .error_for_status()
        .map_err(|e| Error::network(url.as_str(), e.to_string()))?;
    response
        .bytes()
        .await
        .map_err(|e| Error::network(url.as_str(), e.to_string()))
}

fn export_proxy_env(proxy: &ProxyConfig) {
    for (var, value) in [
        ("http_proxy", &proxy.http_proxy),
        ("https_proxy", &proxy.https_proxy),
        ("ftp_proxy", &proxy.ftp_proxy),
        ("no_proxy", &proxy.no_proxy),
    ] {
        if let Some(value) = value {
            // SAFETY: single-threaded startup path (spec §5), before any
            // maintainer script or intercepted process is spawned.
            #[allow(unsafe_code)]
            unsafe {
                std::env::set_var(var, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Packages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Package: a\n\n"))
            .mount(&server)
            .await;

        let downloader = Downloader::new(&ProxyConfig::default(), 1, 1).unwrap();
        let url = Url::parse(&format!("{}/Packages", server.uri())).unwrap();
        let body = downloader.fetch(&url).await.unwrap();
        assert_eq!(body.as_ref(), b"Package: a\n\n");
    }

    #[tokio::test]
    async fn fetch_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let downloader = Downloader::new(&ProxyConfig::default(), 1, 3).unwrap();
        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let body = downloader.fetch(&url).await.unwrap();
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn fetch_fails_after_exhausting_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let downloader = Downloader::new(&ProxyConfig::default(), 1, 2).unwrap();
        let url = Url::parse(&format!("{}/broken", server.uri())).unwrap();
        assert!(downloader.fetch(&url).await.is_err());
    }
}
