mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{
    CompletingEngine, FailingEngine, IdleEngine, app_with, finding, seed_audit, seed_finding,
    temp_store, test_jwt,
};
use repolens::db::Severity;
use std::{fs, sync::Arc, time::Duration};
use tower::ServiceExt;

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not JSON")
}

fn authed_post(uri: &str, jwt: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {jwt}"))
        .body(Body::empty())
        .expect("failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

#[tokio::test]
async fn start_without_stored_token_returns_401_and_creates_no_row() {
    let (store, path) = temp_store("no-token").await;
    let app = app_with(store.clone(), Arc::new(IdleEngine));

    let jwt = test_jwt(42, "octocat");
    let resp = app
        .oneshot(authed_post("/api/audits/start/101", &jwt))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "NO_PROVIDER_TOKEN");
    assert!(store.latest_for_repository(101).await.unwrap().is_none());

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn start_without_bearer_token_returns_401() {
    let (store, path) = temp_store("no-bearer").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/audits/start/101")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn start_returns_202_and_status_is_pending() {
    let (store, path) = temp_store("start-pending").await;
    store
        .upsert_user_token(42, "octocat", "gho_testtoken")
        .await
        .unwrap();
    let app = app_with(store, Arc::new(IdleEngine));

    let jwt = test_jwt(42, "octocat");
    let resp = app
        .clone()
        .oneshot(authed_post("/api/audits/start/101", &jwt))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = body_json(resp).await;
    let audit_id = body["audit_id"].as_i64().expect("audit_id missing");

    let resp = app
        .oneshot(get(&format!("/api/audits/{audit_id}/status")))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["repository_id"], 101);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn second_start_while_in_flight_returns_409() {
    let (store, path) = temp_store("in-flight").await;
    store
        .upsert_user_token(42, "octocat", "gho_testtoken")
        .await
        .unwrap();
    let app = app_with(store, Arc::new(IdleEngine));

    let jwt = test_jwt(42, "octocat");
    let resp = app
        .clone()
        .oneshot(authed_post("/api/audits/start/101", &jwt))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = app
        .oneshot(authed_post("/api/audits/start/101", &jwt))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "AUDIT_IN_FLIGHT");

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn status_of_unknown_audit_returns_404() {
    let (store, path) = temp_store("unknown-status").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(get("/api/audits/9999/status"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn summary_is_an_alias_of_status() {
    let (store, path) = temp_store("summary-alias").await;
    let audit_id = seed_audit(&store, 7, "COMPLETED", "2026-08-27T10:00:00+00:00").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let status = body_json(
        app.clone()
            .oneshot(get(&format!("/api/audits/{audit_id}/status")))
            .await
            .unwrap(),
    )
    .await;
    let summary = body_json(
        app.oneshot(get(&format!("/api/audits/{audit_id}/summary")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, summary);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn latest_returns_404_when_repository_never_audited() {
    let (store, path) = temp_store("latest-none").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(get("/api/audits/latest/77"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn latest_returns_most_recently_created_audit() {
    let (store, path) = temp_store("latest-newest").await;
    seed_audit(&store, 77, "COMPLETED", "2026-08-25T08:00:00+00:00").await;
    let newest = seed_audit(&store, 77, "FAILED", "2026-08-27T09:30:00+00:00").await;
    seed_audit(&store, 77, "COMPLETED", "2026-08-26T12:00:00+00:00").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(get("/api/audits/latest/77"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["audit_id"].as_i64(), Some(newest));
    assert_eq!(body["status"], "FAILED");

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn findings_are_paged_by_severity_then_recency() {
    let (store, path) = temp_store("findings-paging").await;
    let audit_id = seed_audit(&store, 5, "COMPLETED", "2026-08-27T10:00:00+00:00").await;

    // 10 LOW seeded first (older), then 15 HIGH (newer).
    for i in 0..10 {
        let ts = format!("2026-08-27T10:00:{:02}+00:00", i);
        seed_finding(&store, audit_id, Severity::Low, "style", &ts).await;
    }
    for i in 0..15 {
        let ts = format!("2026-08-27T11:00:{:02}+00:00", i);
        seed_finding(&store, audit_id, Severity::High, "security", &ts).await;
    }
    let app = app_with(store, Arc::new(IdleEngine));

    let body = body_json(
        app.clone()
            .oneshot(get(&format!(
                "/api/audits/{audit_id}/findings?page=0&size=20"
            )))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["total_items"], 25);
    assert_eq!(body["total_pages"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 20);
    for item in &items[..15] {
        assert_eq!(item["severity"], "HIGH");
    }
    for item in &items[15..] {
        assert_eq!(item["severity"], "LOW");
    }
    // Within a severity, newest first.
    let high_times: Vec<&str> = items[..15]
        .iter()
        .map(|i| i["created_at"].as_str().unwrap())
        .collect();
    let mut sorted = high_times.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(high_times, sorted);

    let body = body_json(
        app.clone()
            .oneshot(get(&format!(
                "/api/audits/{audit_id}/findings?page=1&size=20"
            )))
            .await
            .unwrap(),
    )
    .await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    for item in items {
        assert_eq!(item["severity"], "LOW");
    }

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn severity_filter_excludes_other_severities() {
    let (store, path) = temp_store("findings-filter").await;
    let audit_id = seed_audit(&store, 5, "COMPLETED", "2026-08-27T10:00:00+00:00").await;
    for i in 0..10 {
        let ts = format!("2026-08-27T10:00:{:02}+00:00", i);
        seed_finding(&store, audit_id, Severity::Low, "style", &ts).await;
    }
    for i in 0..15 {
        let ts = format!("2026-08-27T11:00:{:02}+00:00", i);
        seed_finding(&store, audit_id, Severity::High, "security", &ts).await;
    }
    let app = app_with(store, Arc::new(IdleEngine));

    let body = body_json(
        app.clone()
            .oneshot(get(&format!(
                "/api/audits/{audit_id}/findings?severity=HIGH&size=50"
            )))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["total_items"], 15);
    for item in body["items"].as_array().unwrap() {
        assert_eq!(item["severity"], "HIGH");
    }

    // Category filter composes with severity.
    let body = body_json(
        app.oneshot(get(&format!(
            "/api/audits/{audit_id}/findings?severity=LOW&category=style"
        )))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(body["total_items"], 10);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn unknown_severity_value_returns_400() {
    let (store, path) = temp_store("bad-severity").await;
    let audit_id = seed_audit(&store, 5, "COMPLETED", "2026-08-27T10:00:00+00:00").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(get(&format!(
            "/api/audits/{audit_id}/findings?severity=URGENT"
        )))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn page_size_is_clamped_to_the_configured_cap() {
    let (store, path) = temp_store("size-clamp").await;
    let audit_id = seed_audit(&store, 5, "COMPLETED", "2026-08-27T10:00:00+00:00").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let body = body_json(
        app.oneshot(get(&format!(
            "/api/audits/{audit_id}/findings?size=100000"
        )))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(
        body["size"].as_u64().unwrap(),
        repolens::config::CONFIG.max_page_size as u64
    );

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn findings_of_unknown_audit_return_404() {
    let (store, path) = temp_store("findings-404").await;
    let app = app_with(store, Arc::new(IdleEngine));

    let resp = app
        .oneshot(get("/api/audits/31337/findings"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = fs::remove_file(&path);
}

/// Drives the whole start -> engine -> poll flow through a stub engine that
/// completes with two findings, and checks the summary counts.
#[tokio::test]
async fn completed_audit_reports_summary_counts() {
    let (store, path) = temp_store("completed-flow").await;
    store
        .upsert_user_token(42, "octocat", "gho_testtoken")
        .await
        .unwrap();
    let engine = Arc::new(CompletingEngine(vec![
        finding(Severity::Critical, "security"),
        finding(Severity::Low, "style"),
    ]));
    let app = app_with(store.clone(), engine);

    let jwt = test_jwt(42, "octocat");
    let resp = app
        .clone()
        .oneshot(authed_post("/api/audits/start/909", &jwt))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let audit_id = body_json(resp).await["audit_id"].as_i64().unwrap();

    // The engine runs on a spawned task; poll briefly for the terminal state.
    let mut audit = store.get_audit(audit_id).await.unwrap().unwrap();
    for _ in 0..50 {
        if audit.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        audit = store.get_audit(audit_id).await.unwrap().unwrap();
    }

    let body = body_json(
        app.oneshot(get(&format!("/api/audits/{audit_id}/status")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["total_findings"], 2);
    assert_eq!(body["critical_count"], 1);
    assert_eq!(body["low_count"], 1);
    assert_eq!(body["high_count"], 0);

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn crashed_engine_marks_audit_failed() {
    let (store, path) = temp_store("failed-flow").await;
    store
        .upsert_user_token(42, "octocat", "gho_testtoken")
        .await
        .unwrap();
    let app = app_with(store.clone(), Arc::new(FailingEngine));

    let jwt = test_jwt(42, "octocat");
    let resp = app
        .oneshot(authed_post("/api/audits/start/303", &jwt))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let audit_id = body_json(resp).await["audit_id"].as_i64().unwrap();

    let mut audit = store.get_audit(audit_id).await.unwrap().unwrap();
    for _ in 0..50 {
        if audit.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        audit = store.get_audit(audit_id).await.unwrap().unwrap();
    }
    assert_eq!(audit.status, repolens::db::AuditStatus::Failed);
    assert!(audit.error_message.unwrap().contains("simulated engine crash"));

    let _ = fs::remove_file(&path);
}
