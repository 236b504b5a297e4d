//! End-to-end API scenarios over an in-memory `SQLite` database.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

use impakt_server::{ImpaktServer, ServerConfig};
use impakt_settings::Environment;
use impakt_store::{Database, run_migrations};

fn migrated_db() -> Database {
    let db = Database::sqlite_in_memory().unwrap();
    let mut session = db.session().unwrap();
    let _ = run_migrations(&mut session).unwrap();
    db
}

fn app() -> Router {
    ImpaktServer::new(ServerConfig::default(), migrated_db(), Environment::Development).router()
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn acme_lifecycle() {
    let app = app();

    let (status, created) = call(
        &app,
        Method::POST,
        "/companies",
        Some(json!({"name": "Acme", "stock_ticker": "ACM", "website": "acme.test"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = call(&app, Method::GET, &format!("/companies/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/companies/{id}"),
        Some(json!({"name": "Acme2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Acme2");
    assert_eq!(updated["stock_ticker"], "ACM");
    assert_eq!(updated["website"], "acme.test");

    let (status, deleted) = call(&app, Method::DELETE, &format!("/companies/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, updated);

    let (status, error) = call(&app, Method::GET, &format!("/companies/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        error,
        json!({"status_code": 404, "type": "NOT_FOUND", "message": "Company not found"})
    );
}

#[tokio::test]
async fn list_and_find() {
    let app = app();

    let (status, _) = call(&app, Method::GET, "/sdgs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for name in ["No poverty", "Zero hunger", "Good health"] {
        let (status, _) = call(&app, Method::POST, "/sdgs", Some(json!({"name": name}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, all) = call(&app, Method::GET, "/sdgs", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["No poverty", "Zero hunger", "Good health"]);

    let (status, found) = call(&app, Method::GET, "/sdgs/find?name=Zero%20hunger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["name"], "Zero hunger");

    let (status, _) = call(&app, Method::GET, "/sdgs/find", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::GET, "/sdgs/find?colour=red", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn composite_keys_use_one_segment_each() {
    let app = app();
    let (_, acme) = call(&app, Method::POST, "/companies", Some(json!({"name": "Acme"}))).await;
    let id = acme["id"].as_i64().unwrap();

    let body = json!({"company_id": id, "description": "Makes anvils"});
    let (status, _) = call(&app, Method::POST, "/company-descriptions", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = call(&app, Method::POST, "/company-descriptions", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["type"], "CONFLICT");

    let uri = format!("/company-descriptions/{id}/Makes%20anvils");
    let (status, row) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["description"], "Makes anvils");

    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_parent_is_not_found() {
    let app = app();
    let (status, error) = call(
        &app,
        Method::POST,
        "/sub-sdgs",
        Some(json!({"sdg_id": 42, "name": "Orphan"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["status_code"], 404);
}

#[tokio::test]
async fn invalid_payloads_are_bad_requests() {
    let app = app();

    let (status, _) = call(&app, Method::POST, "/companies", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/companies", Some(json!({"name": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/companies", Some(json!(["Acme"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, acme) = call(&app, Method::POST, "/companies", Some(json!({"name": "Acme"}))).await;
    let id = acme["id"].as_i64().unwrap();
    let (status, error) = call(
        &app,
        Method::POST,
        "/company-initiatives",
        Some(json!({"company_id": id, "name": "Solar", "impact": "HUGE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["message"].as_str().unwrap().contains("impact"));

    let (status, _) = call(&app, Method::GET, "/companies/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn initiative_timestamps_and_links() {
    let app = app();
    let (_, acme) = call(&app, Method::POST, "/companies", Some(json!({"name": "Acme"}))).await;
    let (_, sdg) = call(&app, Method::POST, "/sdgs", Some(json!({"name": "Climate action"}))).await;
    let (_, sub) = call(
        &app,
        Method::POST,
        "/sub-sdgs",
        Some(json!({"sdg_id": sdg["id"], "name": "13.2"})),
    )
    .await;

    let (status, initiative) = call(
        &app,
        Method::POST,
        "/company-initiatives",
        Some(json!({
            "company_id": acme["id"],
            "name": "Solar roofs",
            "date": "2024-03-23T19:47:49",
            "impact": "HIGH",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(initiative["date"], "2024-03-23T19:47:49");
    assert_eq!(initiative["impact"], "HIGH");

    let (status, link) = call(
        &app,
        Method::POST,
        "/company-initiative-sub-sdgs",
        Some(json!({"initiative_id": initiative["id"], "sub_sdg_id": sub["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!(
        "/company-initiative-sub-sdgs/{}/{}",
        link["initiative_id"], link["sub_sdg_id"]
    );
    let (status, fetched) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, link);

    let (status, found) = call(
        &app,
        Method::GET,
        "/company-initiatives/find?date=2024-03-23%2019:47:49",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], initiative["id"]);
}

#[tokio::test]
async fn listen_serves_until_shutdown() {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origin: None,
    };
    let server = ImpaktServer::new(config, migrated_db(), Environment::Production);
    let (addr, handle) = server.listen().await.unwrap();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    let _ = stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains(r#""environment":"production""#));

    server.shutdown().shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
