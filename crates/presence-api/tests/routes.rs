use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use presence_api::{AppStateInner, router};
use presence_db::Database;
use presence_sampler::{ProbeClient, ProbeConfig, Target};
use presence_types::Status;

const KEY: &str = "test-key";

async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    format!("http://{}/probe", listener.local_addr().unwrap())
}

async fn app_with(targets: Vec<Target>) -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let probe = ProbeClient::new(ProbeConfig {
        url: unreachable_url().await,
        timeout: Duration::from_millis(500),
        retries: 0,
    })
    .unwrap();

    let state = Arc::new(AppStateInner {
        db: db.clone(),
        api_key: KEY.to_string(),
        probe,
        targets,
        started_at: Utc::now(),
    });
    (router(state), db)
}

async fn app() -> (Router, Arc<Database>) {
    app_with(Vec::new()).await
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_bad_key_is_forbidden_with_empty_body() {
    let (app, db) = app().await;

    let (status, body) = send(app.clone(), get("/putsample/wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());

    let (status, body) = send(app, post_json("/putsample/wrong", json!({ "observations": [] }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());

    assert_eq!(db.count_samples().unwrap(), 0);
}

#[tokio::test]
async fn test_ingest_sweep_end_to_end() {
    let (app, db) = app().await;

    let (status, body) = send(
        app.clone(),
        post_json(
            &format!("/putsample/{}", KEY),
            json!({
                "elapsed": 1.25,
                "observations": [
                    { "username": "alice", "status": "success" },
                    { "username": "bob", "status": "success" },
                    { "username": "carol", "status": "warning" },
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let resp: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp["status"], "ok");
    assert!(resp["ts"].is_string());
    let id = resp["id"].as_i64().unwrap();

    let sample = db.get_sample(id).unwrap().unwrap().into_sample().unwrap();
    assert_eq!(sample.status, Status::Warning);
    assert_eq!(db.get_presence_points(id).unwrap().len(), 3);

    let (status, body) = send(app, get(&format!("/samples/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(view["status"], "warning");
    assert_eq!(view["elapsed"], 1.25);
    assert_eq!(
        view["points"],
        json!([
            { "user_id": view["points"][0]["user_id"], "username": "alice", "status": "success" },
            { "user_id": view["points"][1]["user_id"], "username": "bob", "status": "success" },
            { "user_id": view["points"][2]["user_id"], "username": "carol", "status": "warning" },
        ])
    );
}

#[tokio::test]
async fn test_ingest_rejects_bad_body() {
    let (app, db) = app().await;
    let uri = format!("/putsample/{}", KEY);

    for body in [
        json!({ "observations": [{ "username": "a", "status": "online" }] }),
        json!({ "observations": [{ "username": " ", "status": "success" }] }),
        json!({ "elapsed": -1.0, "observations": [] }),
        json!({ "nope": true }),
    ] {
        let (status, resp) = send(app.clone(), post_json(&uri, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let resp: Value = serde_json::from_slice(&resp).unwrap();
        assert_eq!(resp, json!({ "status": "error" }));
    }

    assert_eq!(db.count_samples().unwrap(), 0);
}

#[tokio::test]
async fn test_get_putsample_records_failed_probes() {
    let (app, db) = app_with(vec![Target::for_user("alice"), Target::for_user("bob")]).await;

    let (status, body) = send(app, get(&format!("/putsample/{}", KEY))).await;
    assert_eq!(status, StatusCode::CREATED);
    let resp: Value = serde_json::from_slice(&body).unwrap();
    let id = resp["id"].as_i64().unwrap();

    let sample = db.get_sample(id).unwrap().unwrap().into_sample().unwrap();
    assert_eq!(sample.status, Status::Error);
    let points = db.get_presence_points(id).unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.status().unwrap() == Status::Error));
}

#[tokio::test]
async fn test_unknown_sample_is_not_found() {
    let (app, _) = app().await;
    let (status, body) = send(app, get("/samples/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_home_and_health() {
    let (app, _) = app().await;

    let (status, body) = send(app.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Uptime: "));
    assert!(html.contains("Samples: 0"));

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_corrupt_point_is_internal_error() {
    let (app, db) = app().await;
    let ids = db.resolve_user_ids(&["alice", "bob"]).unwrap();
    let id = db
        .insert_sample(Utc::now(), 0.1, &[(ids["alice"], Status::Success), (ids["bob"], Status::Success)])
        .unwrap();

    db.with_conn(|conn| {
        conn.pragma_update(None, "ignore_check_constraints", "ON")?;
        conn.execute(
            "UPDATE presence_points SET status = 'x' WHERE sample_id = ?1 AND user_id = ?2",
            [id, ids["bob"]],
        )?;
        Ok(())
    })
    .unwrap();

    let (status, body) = send(app, get(&format!("/samples/{}", id))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());
}
