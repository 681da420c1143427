//! HTTP routes.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppResult;
use crate::store::ItemStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
}

/// Query parameters of `POST /items`. A repeated `name` resolves to its
/// last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub name: Option<String>,
}

impl ItemQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let name = pairs
            .into_iter()
            .filter(|(key, _)| key == "name")
            .map(|(_, value)| value)
            .last();
        Self { name }
    }
}

pub fn build_router(store: Arc<dyn ItemStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/items", post(create_item))
        .with_state(AppState { store })
}

/// Liveness only; never touches the database.
async fn health() -> Json<Value> {
    info!("GET /health 200");
    Json(json!({ "status": "ok" }))
}

fn unprocessable(loc: Value, msg: &str, kind: &str) -> Response {
    let body = json!({
        "detail": [{
            "loc": loc,
            "msg": msg,
            "type": kind
        }]
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

async fn create_item(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Response> {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            info!("POST /items 422: {}", rejection.body_text());
            return Ok(unprocessable(json!(["query"]), &rejection.body_text(), "value_error"));
        }
    };

    let Some(name) = ItemQuery::from_pairs(pairs).name else {
        info!("POST /items 422: name missing");
        return Ok(unprocessable(json!(["query", "name"]), "Field required", "missing"));
    };

    state.store.insert_item(&name).await?;
    info!("POST /items 200: inserted {:?}", name);
    Ok(Json(json!({ "message": "Item inserted" })).into_response())
}
