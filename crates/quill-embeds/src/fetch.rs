//! Outbound HTTP.
//!
//! Every upstream request in this crate goes through the [`Fetcher`] trait so
//! resolvers can be exercised without a network. [`UreqFetcher`] is the
//! production implementation; `MockFetcher` (behind the `mock` feature)
//! serves canned responses.

use std::io::Read;
use std::time::Duration;

use ureq::Agent;
use ureq::http::Response;

use crate::consts::{DEFAULT_MAX_BODY_BYTES, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::error::EmbedError;

/// A fully read upstream response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with [`EmbedError::Status`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, EmbedError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(EmbedError::Status(self.status))
        }
    }
}

/// Blocking HTTP GET.
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, optionally sending an `Accept` header.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    fn get(&self, url: &str, accept: Option<&str>) -> Result<FetchResponse, EmbedError>;

    /// Like [`get`](Self::get), but a body over the size cap is cut short
    /// instead of failing the request.
    ///
    /// Used for pages, where everything needed sits near the top. Fetchers
    /// without a size cap can rely on the default.
    fn get_prefix(&self, url: &str, accept: Option<&str>) -> Result<FetchResponse, EmbedError> {
        self.get(url, accept)
    }
}

/// Create an HTTP agent with the given global timeout.
pub(crate) fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// [`Fetcher`] backed by a pooled `ureq` agent.
pub struct UreqFetcher {
    agent: Agent,
    user_agent: String,
    max_body: u64,
}

impl UreqFetcher {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Cap the number of body bytes read.
    ///
    /// Larger bodies fail [`Fetcher::get`] and are truncated by
    /// [`Fetcher::get_prefix`].
    #[must_use]
    pub fn max_body(mut self, max_body: u64) -> Self {
        self.max_body = max_body;
        self
    }
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl UreqFetcher {
    fn call(&self, url: &str, accept: Option<&str>) -> Result<Response<ureq::Body>, EmbedError> {
        let mut request = self.agent.get(url).header("User-Agent", &self.user_agent);
        if let Some(accept) = accept {
            request = request.header("Accept", accept);
        }
        Ok(request.call()?)
    }
}

fn header_content_type<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

impl Fetcher for UreqFetcher {
    fn get(&self, url: &str, accept: Option<&str>) -> Result<FetchResponse, EmbedError> {
        let response = self.call(url, accept)?;

        let status = response.status().as_u16();
        let content_type = header_content_type(&response);
        let body = response
            .into_body()
            .with_config()
            .limit(self.max_body)
            .read_to_vec()?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }

    fn get_prefix(&self, url: &str, accept: Option<&str>) -> Result<FetchResponse, EmbedError> {
        let response = self.call(url, accept)?;

        let status = response.status().as_u16();
        let content_type = header_content_type(&response);
        let mut body = Vec::new();
        response
            .into_body()
            .into_reader()
            .take(self.max_body)
            .read_to_end(&mut body)
            .map_err(ureq::Error::from)?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockFetcher;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};

    use super::{FetchResponse, Fetcher};
    use crate::error::EmbedError;

    /// In-memory [`Fetcher`] for tests.
    ///
    /// Responses are keyed by exact URL. Unknown URLs and URLs registered
    /// with [`with_timeout`](Self::with_timeout) fail with
    /// [`EmbedError::Timeout`]. Every request is logged.
    ///
    /// With [`with_max_body`](Self::with_max_body) set, oversized bodies
    /// behave like [`UreqFetcher`](super::UreqFetcher): `get` fails and
    /// `get_prefix` truncates.
    #[derive(Default)]
    pub struct MockFetcher {
        responses: HashMap<String, Option<FetchResponse>>,
        requests: Mutex<Vec<String>>,
        max_body: Option<usize>,
    }

    impl MockFetcher {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_response(mut self, url: impl Into<String>, response: FetchResponse) -> Self {
            self.responses.insert(url.into(), Some(response));
            self
        }

        /// Register a 200 `text/html` page.
        #[must_use]
        pub fn with_html(self, url: impl Into<String>, html: &str) -> Self {
            self.with_body(url, 200, "text/html; charset=utf-8", html.as_bytes())
        }

        /// Register a 200 `application/json` response.
        #[must_use]
        pub fn with_json(self, url: impl Into<String>, json: &serde_json::Value) -> Self {
            self.with_body(url, 200, "application/json", json.to_string().as_bytes())
        }

        /// Register an empty response with `status`.
        #[must_use]
        pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
            self.with_response(
                url,
                FetchResponse {
                    status,
                    content_type: None,
                    body: Vec::new(),
                },
            )
        }

        #[must_use]
        pub fn with_body(
            self,
            url: impl Into<String>,
            status: u16,
            content_type: &str,
            body: &[u8],
        ) -> Self {
            self.with_response(
                url,
                FetchResponse {
                    status,
                    content_type: Some(content_type.to_owned()),
                    body: body.to_vec(),
                },
            )
        }

        #[must_use]
        pub fn with_timeout(mut self, url: impl Into<String>) -> Self {
            self.responses.insert(url.into(), None);
            self
        }

        #[must_use]
        pub fn with_max_body(mut self, max_body: usize) -> Self {
            self.max_body = Some(max_body);
            self
        }

        fn respond(&self, url: &str) -> Result<FetchResponse, EmbedError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_owned());
            self.responses
                .get(url)
                .cloned()
                .flatten()
                .ok_or(EmbedError::Timeout)
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of requests made for `url`.
        pub fn request_count(&self, url: &str) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|requested| *requested == url)
                .count()
        }
    }

    impl Fetcher for MockFetcher {
        fn get(&self, url: &str, _accept: Option<&str>) -> Result<FetchResponse, EmbedError> {
            let response = self.respond(url)?;
            match self.max_body {
                Some(max) if response.body.len() > max => Err(EmbedError::Http(
                    ureq::Error::BodyExceedsLimit(u64::try_from(max).unwrap_or(u64::MAX)),
                )),
                _ => Ok(response),
            }
        }

        fn get_prefix(
            &self,
            url: &str,
            _accept: Option<&str>,
        ) -> Result<FetchResponse, EmbedError> {
            let mut response = self.respond(url)?;
            if let Some(max) = self.max_body {
                response.body.truncate(max);
            }
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_error_for_status() {
        let ok = FetchResponse {
            status: 204,
            ..FetchResponse::default()
        };
        assert!(ok.error_for_status().is_ok());

        let missing = FetchResponse {
            status: 404,
            ..FetchResponse::default()
        };
        assert!(matches!(
            missing.error_for_status(),
            Err(EmbedError::Status(404))
        ));
    }

    #[test]
    fn test_text_is_lossy() {
        let response = FetchResponse {
            status: 200,
            content_type: None,
            body: vec![b'o', b'k', 0xff],
        };
        assert_eq!(response.text(), "ok\u{fffd}");
    }

    #[test]
    fn test_mock_logs_requests_and_times_out_unknown() {
        let fetcher = MockFetcher::new()
            .with_html("https://a.io/", "<title>A</title>")
            .with_timeout("https://slow.io/");

        let page = fetcher.get("https://a.io/", None).unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));

        assert!(matches!(
            fetcher.get("https://slow.io/", None),
            Err(EmbedError::Timeout)
        ));
        assert!(matches!(
            fetcher.get("https://unknown.io/", None),
            Err(EmbedError::Timeout)
        ));
        assert_eq!(
            fetcher.requests(),
            vec!["https://a.io/", "https://slow.io/", "https://unknown.io/"]
        );
        assert_eq!(fetcher.request_count("https://a.io/"), 1);
    }

    #[test]
    fn test_mock_body_cap() {
        let fetcher = MockFetcher::new()
            .with_body("https://a.io/big", 200, "text/html", &[b'x'; 32])
            .with_max_body(8);

        assert!(matches!(
            fetcher.get("https://a.io/big", None),
            Err(EmbedError::Http(ureq::Error::BodyExceedsLimit(8)))
        ));

        let prefix = fetcher.get_prefix("https://a.io/big", None).unwrap();
        assert_eq!(prefix.status, 200);
        assert_eq!(prefix.body, vec![b'x'; 8]);
    }
}
