pub mod auth;
pub mod lesson;
pub mod public;
pub mod user;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRequest,
    http::{HeaderValue, Method, header},
};
use sqlx::SqlitePool;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::warn;
use utoipa::OpenApi;

use crate::{
    config::Config,
    curriculum::Catalog,
    error::{Error, Result},
};

/// Session key holding the logged-in user's uuid
pub const USER_ID_KEY: &str = "user_id";

/// Shared by every request. Nothing in here changes after startup.
#[derive(Debug)]
pub struct AppState {
    pub database: SqlitePool,
    pub catalog: Catalog,
    pub config: Config,
}

/// JSON body whose rejections are reported as `{ "msg": ... }` with status 400
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

pub async fn session_user(session: &Session) -> Result<Option<String>> {
    Ok(session.get::<String>(USER_ID_KEY).await?)
}

/// Fails with `AccessDenied` unless the session belongs to `id`
pub async fn require_self(session: &Session, id: &str) -> Result<()> {
    match session_user(session).await? {
        Some(caller) if caller == id => Ok(()),
        caller => {
            warn!("user {:?} tried to act as {}", caller, id);
            Err(Error::AccessDenied)
        }
    }
}

#[derive(OpenApi)]
#[openapi(paths(
    user::list_users,
    user::list_classes,
    user::get_user,
    user::create_user,
    user::update_user,
    user::delete_user,
    lesson::update_progress,
    lesson::validate_lesson,
    lesson::lesson_states,
    auth::login,
    auth::logout,
    auth::me,
    public::get_curriculum,
))]
pub struct ApiDoc;

pub fn get_openapi_json() -> anyhow::Result<String> {
    Ok(ApiDoc::openapi().to_pretty_json()?)
}

/// Build the application router with sessions kept in `session_store`
pub fn app<Store: SessionStore + Clone>(
    state: Arc<AppState>,
    session_store: Store,
) -> anyhow::Result<Router> {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.session.secure_cookie)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(
            state.config.session.ttl_days,
        )));
    let mut router = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(user::get_user_scope())
                .merge(lesson::get_lesson_scope())
                .merge(auth::get_auth_scope())
                .merge(public::get_public_scope()),
        )
        .layer(session_layer)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());
    if !state.config.cors_origins.is_empty() {
        let origins = state
            .config
            .cors_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        router = router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }
    Ok(router.with_state(state))
}
