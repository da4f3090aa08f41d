use std::sync::Arc;

use actix_web::{test, App};
use serde_json::json;

use chapterd::api::{configure, AppState};
use chapterd::cache::CacheLayer;
use chapterd::config::ApiConfig;
use chapterd::gateway::QueryGateway;
use chapterd::kv::{KeyValueStore, MemoryKvStore};
use chapterd::ratelimit::RateLimiter;
use chapterd::store::MemoryRecordStore;

const ADMIN_TOKEN: &str = "test-admin-token";

fn test_state(max_requests: u64) -> (AppState, MemoryRecordStore) {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
    let store = MemoryRecordStore::new();
    let config = ApiConfig {
        admin_token: ADMIN_TOKEN.to_string(),
        rate_limit_max_requests: max_requests,
        ..Default::default()
    };
    let state = AppState {
        gateway: QueryGateway::new(
            CacheLayer::new(Arc::clone(&kv), config.cache_ttl_secs),
            Arc::new(store.clone()),
        ),
        limiter: Arc::new(RateLimiter::new(
            kv,
            config.rate_limit_window_secs,
            max_requests,
        )),
        config,
    };
    (state, store)
}

fn chapters_json() -> String {
    json!([
        {
            "subject": "Physics",
            "chapter": "Kinematics",
            "class": "Class 10",
            "unit": "Mechanics",
            "yearWiseQuestionCount": {"2023": 4, "2024": 6},
            "status": "In Progress",
            "isWeakChapter": true
        },
        {
            "subject": "Chemistry",
            "chapter": "Atomic Structure",
            "class": "Class 11",
            "unit": "Physical Chemistry",
            "yearWiseQuestionCount": {"2024": 3}
        }
    ])
    .to_string()
}

fn multipart_upload(path: &str, token: Option<&str>, file_json: &str) -> test::TestRequest {
    let boundary = "----chapterd-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"chapters.json\"\r\n\
         Content-Type: application/json\r\n\r\n\
         {file_json}\r\n\
         --{boundary}--\r\n"
    );
    let mut req = test::TestRequest::post().uri(path).insert_header((
        "Content-Type",
        format!("multipart/form-data; boundary={boundary}"),
    ));
    if let Some(token) = token {
        req = req.insert_header(("x-admin-token", token));
    }
    req.set_payload(body)
}

#[actix_web::test]
async fn read_cache_write_invalidate_cycle() {
    let (state, store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    // Seed two chapters.
    let req = multipart_upload("/api/v1/chapters", Some(ADMIN_TOKEN), &chapters_json());
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["uploadedCount"], 2);
    assert_eq!(body["failedChapters"].as_array().unwrap().len(), 0);

    // Cold read hits the record store and caches the response.
    let uri = "/api/v1/chapters?class=Class%2010&page=1&limit=10";
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(resp.status(), 200);
    let first: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["total"], 1);
    assert_eq!(first["page"], 1);
    assert_eq!(first["limit"], 10);
    assert_eq!(first["data"][0]["subject"], "Physics");
    assert_eq!(store.find_calls(), 1);

    // Repeat read is served from cache: no extra store query, same body.
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    let second: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(second, first);
    assert_eq!(store.find_calls(), 1);

    // A write invalidates the namespace; the next read queries the store.
    let extra = json!([{
        "subject": "Maths",
        "chapter": "Trigonometry",
        "class": "Class 10",
        "unit": "Geometry",
        "yearWiseQuestionCount": {"2024": 8}
    }])
    .to_string();
    let req = multipart_upload("/api/v1/chapters", Some(ADMIN_TOKEN), &extra);
    assert_eq!(test::call_service(&app, req.to_request()).await.status(), 200);

    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    let third: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(third["total"], 2);
    assert_eq!(store.find_calls(), 2);
}

#[actix_web::test]
async fn single_chapter_lookup_and_404() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let req = multipart_upload("/api/v1/chapters", Some(ADMIN_TOKEN), &chapters_json());
    test::call_service(&app, req.to_request()).await;

    // Pull an id out of the list response.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/chapters").to_request(),
    )
    .await;
    let list: serde_json::Value = test::read_body_json(resp).await;
    let id = list["data"][0]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/chapters/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], id.as_str());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/chapters/no-such-id")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn extreme_pagination_values_do_not_break_the_request() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let req = multipart_upload("/api/v1/chapters", Some(ADMIN_TOKEN), &chapters_json());
    test::call_service(&app, req.to_request()).await;

    let uri = format!("/api/v1/chapters?page={}&limit=10", u64::MAX);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // The store connection must still be healthy afterwards.
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/chapters").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn upload_requires_admin_token() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let req = multipart_upload("/api/v1/chapters", None, &chapters_json());
    assert_eq!(test::call_service(&app, req.to_request()).await.status(), 403);

    let req = multipart_upload("/api/v1/chapters", Some("wrong-token"), &chapters_json());
    assert_eq!(test::call_service(&app, req.to_request()).await.status(), 403);
}

#[actix_web::test]
async fn upload_rejects_non_array_payload() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let req = multipart_upload(
        "/api/v1/chapters",
        Some(ADMIN_TOKEN),
        r#"{"subject": "Physics"}"#,
    );
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn upload_reports_per_item_failures() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let mixed = json!([
        {
            "subject": "Physics",
            "chapter": "Waves",
            "class": "Class 12",
            "unit": "Oscillations",
            "yearWiseQuestionCount": {"2024": 1}
        },
        {"subject": "incomplete record"}
    ])
    .to_string();
    let req = multipart_upload("/api/v1/chapters", Some(ADMIN_TOKEN), &mixed);
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["uploadedCount"], 1);
    let failed = body["failedChapters"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["data"]["subject"], "incomplete record");
    assert!(!failed[0]["error"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn chapter_routes_are_rate_limited() {
    let (state, _store) = test_state(3);
    let app = test::init_service(App::new().configure(configure(state))).await;

    for _ in 0..3 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/chapters").to_request(),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/chapters").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("Retry-After"));
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Too many requests, please try again later.");

    // Routes outside the chapters scope are not limited.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/setup-admin")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn setup_admin_and_health_endpoints() {
    let (state, _store) = test_state(1000);
    let app = test::init_service(App::new().configure(configure(state))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/setup-admin")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().unwrap().len() >= 16);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/health").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
}
