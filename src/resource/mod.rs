use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::logging::logging_middleware;
use crate::provider::ProviderRegistry;

pub mod credential;
pub mod user;

pub type AppState = Arc<ProviderRegistry>;

/// Routes for every configured realm under `/realms/{realm}`
pub fn router(registry: AppState) -> Router {
    Router::new()
        .route("/realms/{realm}/users", get(user::list_users))
        .route("/realms/{realm}/users/count", get(user::count_users))
        .route(
            "/realms/{realm}/users/{id}",
            get(user::get_user).delete(user::delete_user),
        )
        .route(
            "/realms/{realm}/users/by-username/{username}",
            get(user::get_user_by_username),
        )
        .route(
            "/realms/{realm}/users/by-email/{email}",
            get(user::get_user_by_email),
        )
        .route(
            "/realms/{realm}/credentials/validate",
            post(credential::validate_credentials),
        )
        .route(
            "/realms/{realm}/credentials",
            put(credential::update_credentials),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(registry)
}
