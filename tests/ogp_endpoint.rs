mod common;

use std::sync::atomic::Ordering;

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use common::{CountingStore, app_with, body_bytes, send};
use ogp_backend::config::{AppConfig, ImageRenderConfig};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn header_str<'a>(resp: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    let reader = png::Decoder::new(bytes).read_info().expect("valid png");
    (reader.info().width, reader.info().height)
}

#[tokio::test]
async fn stored_image_is_served_without_rendering() {
    let cached = Bytes::from_static(b"\x89PNG previously rendered");
    let store = CountingStore::with_objects([("ogp-image-caches/alpha.png", cached.clone())]);
    let app = app_with(&AppConfig::default(), store.clone());

    let resp = send(&app, "/?param=alpha").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "content-type"), Some("image/png"));
    assert_eq!(header_str(&resp, "cache-control"), Some("max-age=604800"));
    assert_eq!(header_str(&resp, "x-is-cached"), Some("true"));
    assert_eq!(body_bytes(resp).await, cached);
    assert_eq!(store.puts(), 0);
}

#[tokio::test]
async fn miss_renders_stores_and_then_hits() {
    let store = CountingStore::with_font();
    let app = app_with(&AppConfig::default(), store.clone());

    let first = send(&app, "/?param=beta").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, "cache-control"), Some("max-age=604800"));
    assert!(first.headers().get("x-is-cached").is_none());
    let rendered = body_bytes(first).await;
    assert_eq!(rendered[..8], PNG_SIGNATURE);
    assert_eq!(png_size(&rendered), (1200, 630));

    assert_eq!(store.puts(), 1);
    assert_eq!(
        store.object("ogp-image-caches/beta.png").await,
        Some(rendered.clone())
    );

    let second = send(&app, "/?param=beta").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_str(&second, "x-is-cached"), Some("true"));
    assert_eq!(body_bytes(second).await, rendered);
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn missing_or_empty_param_is_rejected_before_storage() {
    let store = CountingStore::with_font();
    let app = app_with(&AppConfig::default(), store.clone());

    for uri in ["/", "/?param=", "/?other=x"] {
        let resp = send(&app, uri).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            header_str(&resp, "content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(header_str(&resp, "x-error-code"), Some("MISSING_PARAMETER"));
        assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
        let body = body_bytes(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("param"));
    }
    assert_eq!(store.gets(), 0);
    assert_eq!(store.puts(), 0);
}

#[tokio::test]
async fn repeated_param_uses_the_first_value() {
    let store = CountingStore::with_font();
    let app = app_with(&AppConfig::default(), store.clone());

    let resp = send(&app, "/?param=alpha&param=beta").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "content-type"), Some("image/png"));
    assert_eq!(store.puts(), 1);
    assert!(store.object("ogp-image-caches/alpha.png").await.is_some());
    assert!(store.object("ogp-image-caches/beta.png").await.is_none());

    // 空的第一个值同样按缺参处理
    let resp = send(&app, "/?param=&param=beta").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&resp, "x-error-code"), Some("MISSING_PARAMETER"));
}

#[tokio::test]
async fn overlong_param_is_a_validation_error() {
    let app = app_with(&AppConfig::default(), CountingStore::with_font());
    let uri = format!("/?param={}", "x".repeat(300));

    let resp = send(&app, &uri).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&resp, "x-error-code"), Some("VALIDATION_FAILED"));
}

#[tokio::test]
async fn missing_font_fails_without_caching_and_recovers() {
    let store = CountingStore::with_objects::<0>([]);
    let app = app_with(&AppConfig::default(), store.clone());

    let resp = send(&app, "/?param=gamma").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_str(&resp, "x-error-code"), Some("FONT_UNAVAILABLE"));
    assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
    let body = body_bytes(resp).await;
    assert!(
        std::str::from_utf8(&body)
            .unwrap()
            .contains("fonts/NotoSansJP-Regular.otf")
    );
    assert_eq!(store.puts(), 0);
    assert!(store.object("ogp-image-caches/gamma.png").await.is_none());

    // 字体补齐后无需重启
    store
        .seed(common::FONT_KEY, Bytes::from_static(common::FONT))
        .await;
    let resp = send(&app, "/?param=gamma").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-is-cached").is_none());
}

#[tokio::test]
async fn failed_write_back_is_not_remembered() {
    let store = CountingStore::with_font();
    store.fail_puts.store(true, Ordering::SeqCst);
    let app = app_with(&AppConfig::default(), store.clone());

    let resp = send(&app, "/?param=delta").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(header_str(&resp, "x-error-code"), Some("STORAGE_FAILED"));

    // 下一次请求从头再来：重新查存储、重新渲染并写回
    store.fail_puts.store(false, Ordering::SeqCst);
    let gets_before = store.gets();
    let resp = send(&app, "/?param=delta").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("x-is-cached").is_none());
    assert!(store.gets() > gets_before);
    assert_eq!(store.puts(), 2);
    assert!(store.object("ogp-image-caches/delta.png").await.is_some());
}

#[tokio::test]
async fn distinct_params_get_distinct_objects() {
    let store = CountingStore::with_font();
    let app = app_with(&AppConfig::default(), store.clone());

    for uri in ["/?param=a%2Fb", "/?param=a%252Fb", "/?param=a"] {
        assert_eq!(send(&app, uri).await.status(), StatusCode::OK, "{uri}");
    }
    assert_eq!(store.puts(), 3);
    assert!(store.object("ogp-image-caches/a%2Fb.png").await.is_some());
    assert!(store.object("ogp-image-caches/a%252Fb.png").await.is_some());
    assert!(store.object("ogp-image-caches/a.png").await.is_some());
}

#[tokio::test]
async fn disabled_memory_tier_reads_through_to_store() {
    let config = AppConfig {
        image: ImageRenderConfig {
            memory_cache_enabled: false,
            ..ImageRenderConfig::default()
        },
        ..AppConfig::default()
    };
    let store = CountingStore::with_font();
    let app = app_with(&config, store.clone());

    assert_eq!(send(&app, "/?param=eps").await.status(), StatusCode::OK);
    let gets_before = store.gets();

    let resp = send(&app, "/?param=eps").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "x-is-cached"), Some("true"));
    assert_eq!(store.gets(), gets_before + 1);
    assert_eq!(store.puts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_render_once() {
    let store = CountingStore::with_font();
    let app = app_with(&AppConfig::default(), store.clone());

    let responses = futures_util::future::join_all(
        (0..8).map(|_| send(&app, "/?param=zeta")),
    )
    .await;

    let mut fresh = 0;
    let mut bodies = Vec::new();
    for resp in responses {
        assert_eq!(resp.status(), StatusCode::OK);
        if resp.headers().get("x-is-cached").is_none() {
            fresh += 1;
        }
        bodies.push(body_bytes(resp).await);
    }
    assert_eq!(fresh, 1);
    assert_eq!(store.puts(), 1);
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn custom_route_and_max_age_are_honoured() {
    let mut config = AppConfig::default();
    config.api.route = "/ogp".to_string();
    config.image.cache_control_max_age_secs = 60;
    let store = CountingStore::with_objects([(
        "ogp-image-caches/alpha.png",
        Bytes::from_static(b"png"),
    )]);
    let app = app_with(&config, store);

    let resp = send(&app, "/ogp?param=alpha").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "cache-control"), Some("max-age=60"));
    assert_eq!(send(&app, "/?param=alpha").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_service_identity() {
    let app = app_with(&AppConfig::default(), CountingStore::with_font());

    let resp = send(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "ogp-backend");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}
