//! Core HTTP operations with redirect following
//!
//! The reqwest client is built without a redirect policy; this module follows
//! 301/302/307/308 responses itself so the hop limit and the resolution of
//! relative `Location` headers stay under the fetcher's control.

use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::constants::http;
use crate::errors::{FetchError, FetchResult};

/// HTTP operations handler
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
    max_redirects: usize,
    request_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client, hop limit and
    /// per-request header timeout
    pub fn new(client: Client, max_redirects: usize, request_timeout: Duration) -> Self {
        Self {
            client,
            max_redirects,
            request_timeout,
        }
    }

    /// Issue a GET and follow redirects until a non-redirect response arrives
    ///
    /// Returns the final response together with the URL that produced it.
    /// Intermediate response bodies are dropped unread.
    ///
    /// # Errors
    ///
    /// - `FetchError::Network` if a request cannot be sent
    /// - `FetchError::Timeout` if a hop's headers do not arrive in time
    /// - `FetchError::TooManyRedirects` once the hop limit is exceeded
    /// - `FetchError::InvalidUrl` for an unparseable `Location`
    pub async fn get_following_redirects(&self, url: &Url) -> FetchResult<(Response, Url)> {
        let mut current = url.clone();
        let mut hops = 0;

        loop {
            let send = self.client.get(current.clone()).send();
            let response = tokio::time::timeout(self.request_timeout, send)
                .await
                .map_err(|_| FetchError::Timeout {
                    url: current.to_string(),
                    phase: "waiting for response headers",
                    after: self.request_timeout,
                })?
                .map_err(|source| FetchError::Network {
                    url: current.to_string(),
                    source,
                })?;

            let status = response.status().as_u16();
            if !http::REDIRECT_STATUSES.contains(&status) {
                return Ok((response, current));
            }

            let Some(next) = redirect_target(&current, &response)? else {
                // No Location: surfaces as a plain status failure
                return Ok((response, current));
            };

            if hops >= self.max_redirects {
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                    limit: self.max_redirects,
                });
            }

            hops += 1;
            debug!("Redirect {} ({}): {} -> {}", hops, status, current, next);
            drop(response);
            current = next;
        }
    }
}

/// Resolve the `Location` header of a redirect against the current URL
fn redirect_target(current: &Url, response: &Response) -> FetchResult<Option<Url>> {
    let Some(location) = response.headers().get(LOCATION) else {
        return Ok(None);
    };

    let location = location.to_str().map_err(|e| FetchError::InvalidUrl {
        url: format!("{:?}", location),
        reason: e.to_string(),
    })?;

    if location.trim().is_empty() {
        return Ok(None);
    }

    // join() keeps absolute locations as they are
    current
        .join(location)
        .map(Some)
        .map_err(|e| FetchError::InvalidUrl {
            url: location.to_string(),
            reason: e.to_string(),
        })
}
