mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::*;
use reqwest::{Method, Url};
use serde_json::Value;
use std::sync::Arc;
use wp_github_sync::github::{PublishOutcome, Publisher};
use wp_github_sync::model::{RemoteFileState, ShapeMode};

fn publisher(transport: &RecordingTransport) -> Publisher {
    Publisher::new(
        Arc::new(transport.clone()),
        Url::parse(API_BASE).unwrap(),
        "secret".into(),
        ShapeMode::Minified,
    )
}

fn write_body(req: &wp_github_sync::transport::HttpRequest) -> Value {
    serde_json::from_str(req.body.as_deref().expect("PUT has a body")).unwrap()
}

#[tokio::test]
async fn existing_file_is_updated_with_its_sha() {
    let transport = RecordingTransport::new(|req| match req.method {
        Method::GET => ok(r#"{"name":"posts.json","path":"posts.json","sha":"3d21ec53a331a6f037a91c368710b99387d012c1"}"#),
        _ => status(200, r#"{"content":{}}"#),
    });

    let outcome = publisher(&transport)
        .upsert("owner/site", "posts.json", "main", br#"[{"id":1}]"#)
        .await;

    assert_eq!(outcome, PublishOutcome::Written { status: 200, created: false });
    let calls = transport.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].url.as_str(), CONTENTS_URL);
    assert_eq!(calls[1].method, Method::PUT);
    assert_eq!(calls[1].url.as_str(), CONTENTS_URL);
    for call in &calls {
        assert_eq!(call.header_value("Authorization"), Some("token secret"));
        assert_eq!(call.header_value("Content-Type"), Some("application/json"));
    }

    let body = write_body(&calls[1]);
    assert_eq!(body["sha"], "3d21ec53a331a6f037a91c368710b99387d012c1");
    assert_eq!(body["branch"], "main");
    assert_eq!(body["message"], "Auto update minified posts.json from WordPress");
    let decoded = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, br#"[{"id":1}]"#);
}

#[tokio::test]
async fn missing_file_is_created_without_sha() {
    let transport = RecordingTransport::new(|req| match req.method {
        Method::GET => status(404, r#"{"message":"Not Found"}"#),
        _ => status(201, "{}"),
    });

    let outcome = publisher(&transport)
        .upsert("owner/site", "posts.json", "main", b"[]")
        .await;

    assert_eq!(outcome, PublishOutcome::Written { status: 201, created: true });
    let calls = transport.calls().await;
    assert!(write_body(&calls[1]).get("sha").is_none());
}

#[tokio::test]
async fn failed_existence_check_still_attempts_create() {
    let transport = RecordingTransport::new(|req| match req.method {
        Method::GET => status(401, r#"{"message":"Bad credentials"}"#),
        _ => status(401, r#"{"message":"Bad credentials"}"#),
    });

    let p = publisher(&transport);
    let url = p.contents_url("owner/site", "posts.json").unwrap();
    assert_eq!(
        p.remote_state(&url).await,
        RemoteFileState::Unknown { reason: "status 401".into() }
    );

    let outcome = p.upsert("owner/site", "posts.json", "main", b"[]").await;

    assert!(matches!(outcome, PublishOutcome::Rejected { status: 401, .. }));
    let calls = transport.calls().await;
    let put = calls.iter().find(|c| c.method == Method::PUT).unwrap();
    assert!(write_body(put).get("sha").is_none());
}

#[tokio::test]
async fn unreachable_github_is_reported_not_raised() {
    let transport = RecordingTransport::new(unreachable);

    let outcome = publisher(&transport)
        .upsert("owner/site", "posts.json", "main", b"[]")
        .await;

    assert!(matches!(outcome, PublishOutcome::TransportFailed { .. }));
    // one read, one write, no retries
    assert_eq!(transport.calls().await.len(), 2);
}

#[tokio::test]
async fn enterprise_base_without_trailing_slash_keeps_its_path() {
    let transport = RecordingTransport::new(|_| status(404, ""));
    let p = Publisher::new(
        Arc::new(transport),
        Url::parse("https://git.corp.test/api/v3").unwrap(),
        "t".into(),
        ShapeMode::Full,
    );
    let url = p.contents_url("owner/site", "/data/posts.json").unwrap();
    assert_eq!(url.as_str(), "https://git.corp.test/api/v3/repos/owner/site/contents/data/posts.json");
    let payload = p.build_payload("main", b"[]", &RemoteFileState::Missing);
    assert_eq!(payload.message, "Auto update posts.json from WordPress");
}

#[tokio::test]
async fn path_escaping_the_contents_endpoint_sends_no_request() {
    let transport = RecordingTransport::new(|req| panic!("unexpected request to {}", req.url));

    let outcome = publisher(&transport)
        .upsert("owner/site", "../../user", "main", b"[]")
        .await;

    assert!(matches!(outcome, PublishOutcome::TransportFailed { .. }));
    assert!(transport.calls().await.is_empty());
}
