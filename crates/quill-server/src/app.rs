//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/metadata", get(handlers::metadata::get_metadata))
        .route("/api/bluesky-oembed", get(handlers::bluesky::get_oembed))
        .route("/api/image-proxy", get(handlers::image_proxy::get_image))
        .route("/api/render", post(handlers::render::render))
        .route("/api/preview", post(handlers::preview::start_preview))
        .route(
            "/api/preview/{client}/embeds",
            get(handlers::preview::get_preview_embeds),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::csp_layer())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer())
                .layer(security::referrer_policy_layer())
                .layer(security::permissions_policy_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use quill_embeds::{EmbedServices, EmbedTracker, MockFetcher, ResolverSettings};
    use quill_renderer::RenderOptions;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const RESOLVE: &str =
        "https://public.api.bsky.app/xrpc/com.atproto.identity.resolveHandle?handle=alice.test";

    fn router(fetcher: MockFetcher) -> Router {
        let settings = ResolverSettings::default();
        let state = AppState {
            services: Arc::new(EmbedServices::new(
                &settings,
                Arc::new(fetcher),
                &settings.memory_cache(),
            )),
            tracker: Arc::new(EmbedTracker::default()),
            render_options: RenderOptions::default(),
            verbose: false,
            version: "1.2.3".to_owned(),
        };
        create_router(Arc::new(state))
    }

    async fn get(router: &Router, uri: &str) -> Response {
        router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(router: &Router, uri: &str, body: &Value) -> Response {
        router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn header_value<'a>(response: &'a Response, name: &str) -> &'a str {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get(&router(MockFetcher::new()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "ok", "version": "1.2.3"})
        );
    }

    #[tokio::test]
    async fn test_security_headers() {
        let response = get(&router(MockFetcher::new()), "/health").await;
        assert!(header_value(&response, "content-security-policy").contains("frame-src"));
        assert_eq!(header_value(&response, "x-content-type-options"), "nosniff");
        assert_eq!(header_value(&response, "x-frame-options"), "DENY");
        assert_eq!(header_value(&response, "referrer-policy"), "no-referrer");
        assert_eq!(
            header_value(&response, "permissions-policy"),
            "geolocation=(), microphone=(), camera=()"
        );
    }

    #[tokio::test]
    async fn test_metadata_endpoint() {
        let fetcher = MockFetcher::new().with_html(
            "https://example.com/post",
            r#"<meta property="og:title" content="Hello"><meta property="og:site_name" content="Ex">"#,
        );
        let response = get(
            &router(fetcher),
            "/api/metadata?url=https%3A%2F%2Fexample.com%2Fpost",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "cache-control"), "public, max-age=3600");
        let body = json_body(response).await;
        assert_eq!(body["title"], "Hello");
        assert_eq!(body["siteName"], "Ex");
        assert_eq!(body["domain"], "example.com");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_metadata_fallback_is_200() {
        let response = get(
            &router(MockFetcher::new()),
            "/api/metadata?url=https%3A%2F%2Fdown.io%2F",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["description"], "Visit down.io");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_url() {
        let router = router(MockFetcher::new());
        for path in ["/api/metadata", "/api/bluesky-oembed", "/api/image-proxy"] {
            let response = get(&router, path).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(
                json_body(response).await,
                json!({"error": "Missing url parameter"})
            );

            let response = get(&router, &format!("{path}?url=nope")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(json_body(response).await, json!({"error": "Invalid URL"}));
        }
    }

    #[tokio::test]
    async fn test_private_hosts_forbidden() {
        let fetcher = MockFetcher::new()
            .with_html("http://127.0.0.1:6379/", "<title>internal</title>")
            .with_body("http://169.254.169.254/a.png", 200, "image/png", b"PNG");
        let router = router(fetcher);

        for uri in [
            "/api/metadata?url=http%3A%2F%2F127.0.0.1%3A6379%2F",
            "/api/image-proxy?url=http%3A%2F%2F169.254.169.254%2Fa.png",
            "/api/metadata?url=http%3A%2F%2Flocalhost%2F",
        ] {
            let response = get(&router, uri).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(
                json_body(response).await,
                json!({"error": "URL host not allowed"})
            );
        }
    }

    #[tokio::test]
    async fn test_oembed_endpoint() {
        let upstream = "https://embed.bsky.app/oembed?url=https%3A%2F%2Fbsky.app%2Fprofile%2Falice.test%2Fpost%2Fxyz&format=json";
        let document = json!({"type": "rich", "html": "<blockquote>post</blockquote>"});
        let router = router(MockFetcher::new().with_json(upstream, &document));

        let response = get(
            &router,
            "/api/bluesky-oembed?url=https%3A%2F%2Fbsky.app%2Fprofile%2Falice.test%2Fpost%2Fxyz",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, document);

        let response = get(
            &router,
            "/api/bluesky-oembed?url=https%3A%2F%2Fbsky.app%2Fprofile%2Fbob%2Fpost%2F1",
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Failed to fetch oEmbed data"})
        );
    }

    #[tokio::test]
    async fn test_image_proxy_endpoint() {
        let fetcher = MockFetcher::new()
            .with_body("https://cdn.io/a.png", 200, "image/png", b"PNGDATA")
            .with_html("https://cdn.io/page", "<html></html>");
        let router = router(fetcher);

        let response = get(&router, "/api/image-proxy?url=https%3A%2F%2Fcdn.io%2Fa.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "content-type"), "image/png");
        assert_eq!(header_value(&response, "cache-control"), "public, max-age=86400");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"PNGDATA");

        let response = get(&router, "/api/image-proxy?url=https%3A%2F%2Fcdn.io%2Fpage").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Failed to load image"})
        );
    }

    #[tokio::test]
    async fn test_render_resolves_embeds() {
        let fetcher = MockFetcher::new().with_json(RESOLVE, &json!({"did": "did:plc:abc"}));
        let response = post_json(
            &router(fetcher),
            "/api/render",
            &json!({
                "content": "# Post\n{bluesky:https://bsky.app/profile/alice.test/post/xyz}",
                "format": "markdown",
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let html = body["html"].as_str().unwrap();
        assert!(html.contains("<h1>Post</h1>"));
        assert!(html.contains("at://did:plc:abc/app.bsky.feed.post/xyz"));
        assert_eq!(body["blocks"][0]["type"], "heading");
        assert_eq!(body["warnings"], json!([]));
    }

    #[tokio::test]
    async fn test_render_rejects_unknown_format() {
        let response = post_json(
            &router(MockFetcher::new()),
            "/api/render",
            &json!({"content": "x", "format": "rtf"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_loading_then_resolved() {
        let fetcher = MockFetcher::new().with_html("https://example.com/", "<title>Example</title>");
        let router = router(fetcher);

        let response = post_json(
            &router,
            "/api/preview",
            &json!({"client": "editor-1", "content": "{{card:https://example.com/}}"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["html"].as_str().unwrap().contains("embed-loading"));
        assert_eq!(body["embeds"], json!([{"id": 0, "state": "loading"}]));
        let token = body["token"].as_u64().unwrap();

        let uri = format!("/api/preview/editor-1/embeds?token={token}");
        let mut settled = Value::Null;
        for _ in 0..100 {
            let body = json_body(get(&router, &uri).await).await;
            if body["embeds"][0]["state"] != "loading" {
                settled = body;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(settled["embeds"][0]["state"], "resolved");
        assert!(
            settled["embeds"][0]["html"]
                .as_str()
                .unwrap()
                .contains("Example")
        );
    }

    #[tokio::test]
    async fn test_superseded_preview_is_409() {
        let router = router(MockFetcher::new());
        let first = json_body(
            post_json(
                &router,
                "/api/preview",
                &json!({"client": "editor-1", "content": "one"}),
            )
            .await,
        )
        .await;
        post_json(
            &router,
            "/api/preview",
            &json!({"client": "editor-1", "content": "two"}),
        )
        .await;

        let uri = format!(
            "/api/preview/editor-1/embeds?token={}",
            first["token"].as_u64().unwrap()
        );
        let response = get(&router, &uri).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Preview session superseded"})
        );
    }
}
