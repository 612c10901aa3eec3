use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::AppState;
use crate::backend::UserRecord;
use crate::error::AppError;
use crate::query::{Pageable, SearchCriteria};
use crate::repository::UserRepository;

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

const PAGE: &str = "page";
const SIZE: &str = "size";
const DEFAULT_PAGE_SIZE: u64 = 20;

async fn repository(state: &AppState, realm: &str) -> Result<UserRepository, (StatusCode, Json<Value>)> {
    state.repository(realm).await.map_err(|e| e.to_response())
}

fn parse_number(params: &HashMap<String, String>, key: &str) -> Result<Option<u64>, AppError> {
    params
        .get(key)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| AppError::BadRequest(format!("Invalid {} parameter: {}", key, value)))
        })
        .transpose()
}

/// Split query parameters into a page request and search criteria
fn search_request(
    mut params: HashMap<String, String>,
) -> Result<(SearchCriteria, Option<Pageable>), AppError> {
    let page = parse_number(&params, PAGE)?;
    let size = parse_number(&params, SIZE)?;
    params.remove(PAGE);
    params.remove(SIZE);

    let pageable = match (page, size) {
        (None, None) => None,
        (page, size) => Some(Pageable::new(
            page.unwrap_or(0),
            size.unwrap_or(DEFAULT_PAGE_SIZE),
        )),
    };
    Ok((SearchCriteria::from(params), pageable))
}

fn found(record: Option<UserRecord>, what: &str) -> HandlerResult<UserRecord> {
    record
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", what)).to_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult<Vec<UserRecord>> {
    let (criteria, pageable) = search_request(params).map_err(|e| e.to_response())?;
    let repo = repository(&state, &realm).await?;

    let users = if criteria.is_empty() && pageable.is_none() {
        repo.get_all_users().await
    } else {
        repo.find_users(&criteria, pageable.as_ref()).await
    };
    Ok(Json(users))
}

pub async fn count_users(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult<Value> {
    let (criteria, _) = search_request(params).map_err(|e| e.to_response())?;
    let repo = repository(&state, &realm).await?;
    Ok(Json(json!({ "count": repo.get_users_count(&criteria).await })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path((realm, id)): Path<(String, String)>,
) -> HandlerResult<UserRecord> {
    let repo = repository(&state, &realm).await?;
    found(repo.find_user_by_id(&id).await, &id)
}

pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path((realm, username)): Path<(String, String)>,
) -> HandlerResult<UserRecord> {
    let repo = repository(&state, &realm).await?;
    found(repo.find_user_by_username(&username).await, &username)
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path((realm, email)): Path<(String, String)>,
) -> HandlerResult<UserRecord> {
    let repo = repository(&state, &realm).await?;
    found(repo.find_user_by_email(&email).await, &email)
}

/// Reports the realm's delete policy; nothing is removed from the database
pub async fn delete_user(
    State(state): State<AppState>,
    Path((realm, _id)): Path<(String, String)>,
) -> HandlerResult<Value> {
    let repo = repository(&state, &realm).await?;
    Ok(Json(json!({ "removed": repo.remove_user() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_search_request_without_paging() {
        let (criteria, pageable) = search_request(params(&[("search", "bob")])).unwrap();
        assert_eq!(criteria, SearchCriteria::new().keyword("bob"));
        assert!(pageable.is_none());
    }

    #[test]
    fn test_search_request_paging_keys_are_not_criteria() {
        let (criteria, pageable) =
            search_request(params(&[("page", "2"), ("size", "5")])).unwrap();
        assert!(criteria.is_empty());
        assert_eq!(pageable, Some(Pageable::new(2, 5)));

        let (_, pageable) = search_request(params(&[("page", "1")])).unwrap();
        assert_eq!(pageable, Some(Pageable::new(1, DEFAULT_PAGE_SIZE)));
    }

    #[test]
    fn test_search_request_rejects_bad_numbers() {
        assert!(matches!(
            search_request(params(&[("size", "-1")])),
            Err(AppError::BadRequest(_))
        ));
    }
}
