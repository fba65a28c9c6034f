//! Throttled decisions: cache hits within the period, background refresh
//! after it.

use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switcher_client::{Client, Context, ContextOptions};

// -- Helpers --------------------------------------------------------------

fn given_context(url: &str, options: ContextOptions) -> Client {
    Client::build_context(Context::new(
        "Playground",
        url,
        "[API_KEY]",
        "switcher-playground",
        "default",
        options.with_throttle_max_workers(2),
    ))
    .unwrap()
}

async fn given_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/criteria/auth"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "[token]",
                "exp": Utc::now().timestamp() + 3600,
            })),
        )
        .mount(server)
        .await;
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn throttled_calls_reuse_the_cached_decision() {
    let server = MockServer::start().await;
    given_auth(&server).await;

    // Exactly one criteria call is allowed within the throttle period.
    Mock::given(method("POST"))
        .and(path("/criteria"))
        .and(query_param("key", "MY_SWITCHER_THROTTLE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = given_context(&server.uri(), ContextOptions::default());
    let mut switcher = client.switcher("MY_SWITCHER_THROTTLE");
    switcher.throttle(Duration::from_secs(1));

    let first = switcher.is_on_with_details().await.unwrap();
    assert!(first.result);
    assert!(!first.is_cached());

    let second = switcher.is_on_with_details().await.unwrap();
    assert!(second.result);
    assert!(second.is_cached());

    assert!(switcher.is_on().await.unwrap());
}

#[tokio::test]
async fn cache_refreshes_in_the_background_after_the_period() {
    let server = MockServer::start().await;
    given_auth(&server).await;

    // The first remote call says on; the refresh after the period says off.
    Mock::given(method("POST"))
        .and(path("/criteria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": true})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/criteria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": false})))
        .expect(1)
        .mount(&server)
        .await;

    let client = given_context(&server.uri(), ContextOptions::default());
    let mut switcher = client.switcher("MY_SWITCHER_THROTTLE");
    switcher.throttle(Duration::from_millis(200));

    assert!(switcher.is_on().await.unwrap());

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Past the period: this call is served from the cache while the
    // refresh runs in the background.
    let stale = switcher.is_on_with_details().await.unwrap();
    assert!(stale.result);
    assert!(stale.is_cached());

    tokio::time::sleep(Duration::from_millis(120)).await;

    let refreshed = switcher.is_on_with_details().await.unwrap();
    assert!(!refreshed.result);
    assert!(refreshed.is_cached());
}

#[tokio::test]
async fn freeze_prevents_background_refresh() {
    let server = MockServer::start().await;
    given_auth(&server).await;

    Mock::given(method("POST"))
        .and(path("/criteria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = given_context(&server.uri(), ContextOptions::default().with_freeze(true));
    let mut switcher = client.switcher("MY_SWITCHER_FROZEN");
    switcher.throttle(Duration::from_millis(50));

    assert!(switcher.is_on().await.unwrap());
    tokio::time::sleep(Duration::from_millis(120)).await;

    // Period elapsed, but frozen handles never refresh: still one
    // criteria call in total.
    let detail = switcher.is_on_with_details().await.unwrap();
    assert!(detail.result);
    assert!(detail.is_cached());
    tokio::time::sleep(Duration::from_millis(120)).await;
}

#[tokio::test]
async fn throttle_implies_execution_logging() {
    let server = MockServer::start().await;
    given_auth(&server).await;
    Mock::given(method("POST"))
        .and(path("/criteria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": true})))
        .mount(&server)
        .await;

    // Logger option off; throttle still records the decision.
    let client = given_context(&server.uri(), ContextOptions::default());
    let mut switcher = client.switcher("MY_SWITCHER_THROTTLE");
    switcher.throttle(Duration::from_secs(1));
    assert!(switcher.is_on().await.unwrap());

    let execution = client.get_execution(&switcher);
    assert_eq!(execution.key, "MY_SWITCHER_THROTTLE");
    assert!(execution.response.is_cached());
}
