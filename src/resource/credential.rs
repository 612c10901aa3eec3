use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub username: String,
    pub password: String,
}

pub async fn validate_credentials(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    Json(request): Json<CredentialRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let repo = state.repository(&realm).await.map_err(|e| e.to_response())?;
    let valid = repo
        .validate_credentials(&request.username, &request.password)
        .await
        .map_err(|e| e.to_response())?;
    Ok(Json(json!({ "valid": valid })))
}

pub async fn update_credentials(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    Json(request): Json<CredentialRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if request.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Password cannot be empty" })),
        ));
    }

    let repo = state.repository(&realm).await.map_err(|e| e.to_response())?;
    let updated = repo
        .update_credentials(&request.username, &request.password)
        .await
        .map_err(|e| e.to_response())?;
    Ok(Json(json!({ "updated": updated })))
}
