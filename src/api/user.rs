use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{AppState, JsonBody};
use crate::{
    error::{Message, Result},
    user::{self, NewUser, UserInfo, UserUpdate},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Only learners of this class
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Learners", body = Vec<UserInfo>),
        (status = 500, description = "Internal server error", body = Message)
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserInfo>>> {
    let users = user::list_learners(&state.database, query.class_name.as_deref()).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/classes",
    responses(
        (status = 200, description = "Distinct classes of learners, ascending", body = Vec<String>),
        (status = 500, description = "Internal server error", body = Message)
    )
)]
pub async fn list_classes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    Ok(Json(user::list_classes(&state.database).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User uuid")),
    responses(
        (status = 200, description = "User", body = UserInfo),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserInfo>> {
    Ok(Json(user::get_user(&state.database, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = Message),
        (status = 400, description = "Invalid input or email already registered", body = Message)
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<Message>)> {
    user::create_user(&state.database, new_user).await?;
    Ok((StatusCode::CREATED, Json(Message::new("user created"))))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User uuid")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = Message),
        (status = 400, description = "Invalid input", body = Message),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<UserUpdate>,
) -> Result<Json<Message>> {
    user::update_user(&state.database, &id, update).await?;
    Ok(Json(Message::new("user updated")))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User uuid")),
    responses(
        (status = 200, description = "User deleted", body = Message),
        (status = 404, description = "User not found", body = Message)
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Message>> {
    user::delete_user(&state.database, &id).await?;
    Ok(Json(Message::new("user deleted")))
}

pub fn get_user_scope() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/classes", get(list_classes))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
