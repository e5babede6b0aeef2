use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;
use utoipa::ToSchema;

use super::{AppState, JsonBody, USER_ID_KEY, session_user};
use crate::{
    error::{Error, Message, Result},
    user::{self, UserInfo},
};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = UserInfo),
        (status = 401, description = "Invalid credentials", body = Message)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<UserInfo>> {
    let LoginRequest { email, password } = req;
    let id = user::login(&state.database, &email, &password).await?;
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, &id).await?;
    info!("user {} logged in", id);
    Ok(Json(user::get_user(&state.database, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = Message)
    )
)]
pub async fn logout(session: Session) -> Result<Json<Message>> {
    session.flush().await?;
    Ok(Json(Message::new("logged out")))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The logged-in user", body = UserInfo),
        (status = 401, description = "Not logged in", body = Message)
    )
)]
pub async fn me(State(state): State<Arc<AppState>>, session: Session) -> Result<Json<UserInfo>> {
    let Some(id) = session_user(&session).await? else {
        return Err(Error::Unauthorized);
    };
    Ok(Json(user::get_user(&state.database, &id).await?))
}

pub fn get_auth_scope() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/me", get(me)),
    )
}
