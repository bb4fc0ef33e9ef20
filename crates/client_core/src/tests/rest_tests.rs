use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone, Default)]
struct ApiState {
    users: Arc<Mutex<Vec<Value>>>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

async fn list_users(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    *state.last_query.lock().await = params;
    *state.last_auth.lock().await = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let users = state.users.lock().await.clone();
    let total = users.len();
    Json(json!({"items": users, "total": total}))
}

async fn create_user(State(state): State<ApiState>, Json(draft): Json<Value>) -> Json<Value> {
    let mut users = state.users.lock().await;
    let mut created = draft;
    created["id"] = json!(100 + users.len());
    users.push(created.clone());
    Json(created)
}

async fn get_user(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    let users = state.users.lock().await;
    match users.iter().find(|user| user["id"] == json!(id)) {
        Some(user) => (StatusCode::OK, Json(user.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "not_found", "message": format!("user {id} not found")}})),
        ),
    }
}

async fn patch_user(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(fields): Json<Value>,
) -> impl IntoResponse {
    if fields.get("name") == Some(&json!("")) {
        return (
            StatusCode::OK,
            Json(json!({"error": {"code": "validation", "message": "name must not be empty"}})),
        );
    }
    let mut users = state.users.lock().await;
    match users.iter_mut().find(|user| user["id"] == json!(id)) {
        Some(user) => {
            if let (Some(target), Some(patch)) = (user.as_object_mut(), fields.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
            (StatusCode::OK, Json(user.clone()))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn delete_user(State(state): State<ApiState>, Path(id): Path<String>) -> StatusCode {
    let mut users = state.users.lock().await;
    let before = users.len();
    users.retain(|user| user["id"] != json!(id));
    if users.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn spawn_api_server() -> Result<(String, ApiState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ApiState::default();
    state.users.lock().await.extend([
        json!({"id": "u1", "name": "Alice"}),
        json!({"id": "u2", "name": "Bob"}),
    ]);
    let app = Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).patch(patch_user).delete(delete_user),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api/"), state))
}

fn users() -> EntityType {
    EntityType::from("users")
}

#[tokio::test]
async fn fetch_collection_sends_query_and_token() {
    let (base_url, state) = spawn_api_server().await.expect("spawn server");
    let transport = RestTransport::new(&base_url, AuthContext::bearer("t0ken")).expect("transport");

    let page = transport
        .fetch_collection(&users(), &CollectionQuery::page(1).with_filter("q", "al"))
        .await
        .expect("page");

    assert_eq!(page.total, 2);
    assert_eq!(
        page.items.iter().map(|e| e.id.clone()).collect::<Vec<_>>(),
        vec![EntityId::from("u1"), EntityId::from("u2")]
    );
    let query = state.last_query.lock().await.clone();
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
    assert_eq!(query.get("q").map(String::as_str), Some("al"));
    assert_eq!(
        state.last_auth.lock().await.as_deref(),
        Some("Bearer t0ken")
    );
}

#[tokio::test]
async fn create_returns_server_assigned_numeric_id() {
    let (base_url, _state) = spawn_api_server().await.expect("spawn server");
    let transport = RestTransport::new(&base_url, AuthContext::anonymous()).expect("transport");

    let mut draft = Map::new();
    draft.insert("name".into(), json!("Carol"));
    let created = transport.create_one(&users(), &draft).await.expect("create");

    assert_eq!(created.id, EntityId::from("102"));
    assert_eq!(created.field("name"), Some(&json!("Carol")));
}

#[tokio::test]
async fn not_found_maps_to_status_error() {
    let (base_url, _state) = spawn_api_server().await.expect("spawn server");
    let transport = RestTransport::new(&base_url, AuthContext::anonymous()).expect("transport");

    let err = transport
        .fetch_one(&users(), &EntityId::from("nobody"))
        .await
        .expect_err("must fail");
    match &err {
        TransportError::Status { status, message } => {
            assert_eq!(*status, 404);
            assert_eq!(message, "user nobody not found");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = transport
        .delete_one(&users(), &EntityId::from("nobody"))
        .await
        .expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn soft_error_in_ok_body_is_rejected() {
    let (base_url, _state) = spawn_api_server().await.expect("spawn server");
    let transport = RestTransport::new(&base_url, AuthContext::anonymous()).expect("transport");

    let mut fields = Map::new();
    fields.insert("name".into(), json!(""));
    let err = transport
        .patch_one(&users(), &EntityId::from("u1"), &fields)
        .await
        .expect_err("must fail");

    match err {
        TransportError::Rejected(error) => {
            assert_eq!(error.code, ErrorCode::Validation);
            assert_eq!(error.message, "name must not be empty");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn patch_and_delete_round_trip() {
    let (base_url, state) = spawn_api_server().await.expect("spawn server");
    let transport = RestTransport::new(&base_url, AuthContext::anonymous()).expect("transport");

    let mut fields = Map::new();
    fields.insert("name".into(), json!("Alicia"));
    let patched = transport
        .patch_one(&users(), &EntityId::from("u1"), &fields)
        .await
        .expect("patch");
    assert_eq!(patched.field("name"), Some(&json!("Alicia")));

    transport
        .delete_one(&users(), &EntityId::from("u2"))
        .await
        .expect("delete");
    assert_eq!(state.users.lock().await.len(), 1);
}

#[test]
fn rejects_base_urls_that_cannot_hold_paths() {
    assert!(matches!(
        RestTransport::new("mailto:ops@example.com", AuthContext::anonymous()),
        Err(TransportError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        RestTransport::new("not a url", AuthContext::anonymous()),
        Err(TransportError::InvalidUrl(_))
    ));
}

#[test]
fn auth_context_debug_redacts_token() {
    let rendered = format!("{:?}", AuthContext::bearer("super-secret"));
    assert!(!rendered.contains("super-secret"));
    assert!(AuthContext::bearer("x").is_authenticated());
}
