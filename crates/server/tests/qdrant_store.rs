//! Remote backend against an in-process fake of the Qdrant REST API.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use charid_core::{fingerprint, parse_tags, NewIdentity};
use charid_server::service::{IdentityService, ServiceConfig};
use charid_server::store::{BackendError, IdentityStore, RemoteConfig, RemoteStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeQdrant {
    /// Collection name to the `vectors` config it was created with.
    collections: HashMap<String, Value>,
    create_calls: usize,
    points: Vec<Value>,
    api_keys: Vec<Option<String>>,
    /// When set, searches answer 500.
    fail_search: bool,
}

type Shared = Arc<Mutex<FakeQdrant>>;

fn ok(result: Value) -> Json<Value> {
    Json(json!({ "result": result, "status": "ok", "time": 0.001 }))
}

fn record_key(state: &Shared, headers: &HeaderMap) {
    let key = headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().api_keys.push(key);
}

async fn list_collections(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    record_key(&state, &headers);
    let names: Vec<Value> = state
        .lock()
        .collections
        .keys()
        .map(|name| json!({ "name": name }))
        .collect();
    ok(json!({ "collections": names }))
}

async fn create_collection(
    State(state): State<Shared>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut fake = state.lock();
    fake.create_calls += 1;
    fake.collections.insert(name, body["vectors"].clone());
    ok(json!(true))
}

async fn upsert_points(
    State(state): State<Shared>,
    Path(_name): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut fake = state.lock();
    for point in body["points"].as_array().cloned().unwrap_or_default() {
        fake.points.push(point);
    }
    ok(json!({ "operation_id": fake.points.len(), "status": "completed" }))
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (na * nb)
}

fn as_vector(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|xs| xs.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

async fn search_points(
    State(state): State<Shared>,
    Path(_name): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if state.lock().fail_search {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "search unavailable"));
    }
    let query = as_vector(&body["vector"]);
    let limit = body["limit"].as_u64().unwrap_or(10) as usize;
    let fake = state.lock();
    let mut hits: Vec<Value> = fake
        .points
        .iter()
        .map(|p| {
            json!({
                "id": p["id"],
                "version": 0,
                "score": cosine(&query, &as_vector(&p["vector"])),
                "payload": p["payload"],
            })
        })
        .collect();
    hits.sort_by(|a, b| {
        b["score"]
            .as_f64()
            .unwrap()
            .total_cmp(&a["score"].as_f64().unwrap())
    });
    hits.truncate(limit);
    Ok(ok(Value::Array(hits)))
}

async fn spawn_fake(state: Shared) -> String {
    let app = Router::new()
        .route("/collections", get(list_collections))
        .route("/collections/:name", put(create_collection))
        .route("/collections/:name/points", put(upsert_points))
        .route("/collections/:name/points/search", post(search_points))
        .with_state(state);
    serve(app).await
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn connect_creates_missing_collection() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;

    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();
    assert_eq!(store.collection(), "characters");

    let fake = state.lock();
    assert_eq!(fake.create_calls, 1);
    let vectors = &fake.collections["characters"];
    assert_eq!(vectors["size"], 256);
    assert_eq!(vectors["distance"], "Cosine");
}

#[tokio::test]
async fn connect_reuses_existing_collection() {
    let state = Shared::default();
    state
        .lock()
        .collections
        .insert("characters".to_string(), json!({ "size": 256, "distance": "Cosine" }));
    let url = spawn_fake(state.clone()).await;

    RemoteStore::connect(RemoteConfig::new(format!("{}/", url), "characters"))
        .await
        .unwrap();
    RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    assert_eq!(state.lock().create_calls, 0);
}

#[tokio::test]
async fn register_and_query_round_trip() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    let hero = fingerprint(b"hero image bytes");
    let record = store
        .register(
            NewIdentity::new("Test Hero", hero.clone())
                .with_notes("caped")
                .with_tags(parse_tags(Some("hero, blue"))),
        )
        .await
        .unwrap();
    store
        .register(NewIdentity::new("Villain", fingerprint(b"villain image bytes")))
        .await
        .unwrap();

    let matches = store.query(&hero, 5).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, record.id.to_string());
    assert_eq!(matches[0].label, "Test Hero");
    assert_eq!(matches[0].notes, "caped");
    assert_eq!(
        matches[0].tags.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["blue", "hero"]
    );
    assert_eq!(matches[0].source, "custom dataset");
    assert!(matches[0].score >= 0.99);
    assert!(matches[0].score >= matches[1].score);

    let limited = store.query(&hero, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert!(store.query(&hero, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_empty_collection() {
    let state = Shared::default();
    let url = spawn_fake(state).await;
    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    let matches = store.query(&fingerprint(b"anything"), 5).await.unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn missing_payload_fields_get_defaults() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    let embedding = fingerprint(b"legacy point");
    state.lock().points.push(json!({
        "id": 7,
        "vector": embedding.as_slice(),
        "payload": {},
    }));

    let matches = store.query(&embedding, 5).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "7");
    assert_eq!(matches[0].label, "Unknown");
    assert_eq!(matches[0].notes, "");
    assert!(matches[0].tags.is_empty());
    assert_eq!(matches[0].source, "custom dataset");
}

#[tokio::test]
async fn api_key_is_sent_when_configured() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;

    RemoteStore::connect(
        RemoteConfig::new(url.clone(), "characters").with_api_key(Some("secret".into())),
    )
    .await
    .unwrap();
    RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    let keys = state.lock().api_keys.clone();
    assert_eq!(keys, vec![Some("secret".to_string()), None]);
}

#[tokio::test]
async fn error_status_surfaces_as_remote_error() {
    let app = Router::new().route(
        "/collections",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "index exploded") }),
    );
    let url = serve(app).await;

    let err = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap_err();
    match err {
        BackendError::Remote { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "index exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn collection_names_are_percent_encoded() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let name = "my chars/v2?x";

    let store = RemoteStore::connect(RemoteConfig::new(url.clone(), name))
        .await
        .unwrap();
    assert!(state.lock().collections.contains_key(name));

    let hero = fingerprint(b"hero");
    store
        .register(NewIdentity::new("Test Hero", hero.clone()))
        .await
        .unwrap();
    let matches = store.query(&hero, 5).await.unwrap();
    assert_eq!(matches[0].label, "Test Hero");

    RemoteStore::connect(RemoteConfig::new(url, name))
        .await
        .unwrap();
    assert_eq!(state.lock().create_calls, 1);
}

#[tokio::test]
async fn foreign_payload_types_do_not_fail_search() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();

    let embedding = fingerprint(b"foreign point");
    state.lock().points.push(json!({
        "id": 8,
        "vector": embedding.as_slice(),
        "payload": { "label": "Foreign", "tags": "hero, blue" },
    }));
    store
        .register(NewIdentity::new("Native", fingerprint(b"native")))
        .await
        .unwrap();

    let matches = store.query(&embedding, 5).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].label, "Foreign");
    assert_eq!(
        matches[0].tags.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["blue", "hero"]
    );
}

#[tokio::test]
async fn search_failure_fails_query_and_identify() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let store = RemoteStore::connect(RemoteConfig::new(url, "characters"))
        .await
        .unwrap();
    store
        .register(NewIdentity::new("Test Hero", fingerprint(b"hero")))
        .await
        .unwrap();
    state.lock().fail_search = true;

    let err = store.query(&fingerprint(b"hero"), 5).await.unwrap_err();
    match err {
        BackendError::Remote { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "search unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }

    let service = IdentityService::new(store.into(), ServiceConfig::default());
    let result = service.identify(b"hero").await;
    assert!(matches!(
        result,
        Err(BackendError::Remote { status: 500, .. })
    ));
}

#[tokio::test]
async fn unreachable_index_is_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = RemoteStore::connect(RemoteConfig::new(format!("http://{}", addr), "characters"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Http(_)));
}

#[tokio::test]
async fn malformed_url_is_rejected() {
    let err = RemoteStore::connect(RemoteConfig::new("not a url", "characters"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidUrl(_)));

    let err = RemoteStore::connect(RemoteConfig::new("mailto:ops@example.com", "characters"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidUrl(_)));
}
