use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{friends, profile, uploads, users};

/// Multipart framing overhead allowed on top of the picture itself.
const MULTIPART_SLACK: usize = 64 * 1024;

/// Every HTTP route of the service. Cross-cutting layers (CORS, tracing,
/// static frontend) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/status", get(auth::status))
        .route("/health", get(|| async { "ok" }));

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/current_user", get(auth::current_user))
        .route(
            "/upload",
            post(uploads::upload_profile_picture)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_SLACK)),
        )
        .route("/api/friend_request/send", post(friends::send_request))
        .route("/api/friend_request/respond", post(friends::respond_request))
        .route("/api/friends", get(friends::list_friends))
        .route("/api/friend_requests", get(friends::list_requests))
        .route("/api/allusers", get(users::all_users))
        .route("/api/user/username/{username}", get(users::user_by_username))
        .route("/api/users_by_education", post(users::users_by_education))
        .route("/api/user_info", post(profile::update_user_info))
        .route("/api/user_info/{username}", get(profile::get_user_info))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/store/uploads", ServeDir::new(&state.upload_dir))
        .with_state(state)
}
