//! HTTP request handlers.

pub(crate) mod bluesky;
pub(crate) mod health;
pub(crate) mod image_proxy;
pub(crate) mod metadata;
pub(crate) mod preview;
pub(crate) mod render;

use serde::Deserialize;

use crate::error::ServerError;

/// Query string of the proxy endpoints.
#[derive(Deserialize)]
pub(crate) struct UrlQuery {
    url: Option<String>,
}

impl UrlQuery {
    /// The `url` parameter, required to be an absolute HTTP(S) URL.
    pub(crate) fn require_url(self) -> Result<String, ServerError> {
        let url = self
            .url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .ok_or(ServerError::MissingUrl)?;
        if quill_renderer::is_valid_url(&url) {
            Ok(url)
        } else {
            Err(ServerError::InvalidUrl(url))
        }
    }

    /// Like [`require_url`](Self::require_url), also refusing loopback,
    /// private and link-local hosts. Used by endpoints that fetch the URL.
    pub(crate) fn require_public_url(self) -> Result<String, ServerError> {
        let url = self.require_url()?;
        match url::Url::parse(&url) {
            Ok(parsed) if !quill_embeds::is_private_host(&parsed) => Ok(url),
            _ => Err(ServerError::ForbiddenHost(url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: Option<&str>) -> UrlQuery {
        UrlQuery {
            url: url.map(str::to_owned),
        }
    }

    #[test]
    fn test_require_url() {
        assert_eq!(
            query(Some(" https://a.io/x ")).require_url().unwrap(),
            "https://a.io/x"
        );
        assert!(matches!(query(None).require_url(), Err(ServerError::MissingUrl)));
        assert!(matches!(query(Some("")).require_url(), Err(ServerError::MissingUrl)));
        assert!(matches!(
            query(Some("not a url")).require_url(),
            Err(ServerError::InvalidUrl(_))
        ));
        assert!(matches!(
            query(Some("ftp://a.io/x")).require_url(),
            Err(ServerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_require_public_url() {
        assert_eq!(
            query(Some("https://a.io/x")).require_public_url().unwrap(),
            "https://a.io/x"
        );
        for url in ["http://localhost:8080/", "http://10.0.0.5/", "http://[::1]/"] {
            assert!(
                matches!(
                    query(Some(url)).require_public_url(),
                    Err(ServerError::ForbiddenHost(_))
                ),
                "{url}"
            );
        }
        assert!(matches!(
            query(Some("nope")).require_public_url(),
            Err(ServerError::InvalidUrl(_))
        ));
    }
}
