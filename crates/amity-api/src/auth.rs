use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::HeaderMap, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use amity_db::Database;
use amity_types::api::{
    AuthResponse, Claims, CurrentUser, LoginRequest, LoginStatus, RegisterRequest, StatusMessage,
};

use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{SESSION_COOKIE, authenticate};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lifetime of a login session and of the token that points at it.
    pub session_ttl: chrono::Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !USERNAME_LEN.contains(&req.username.chars().count()) {
        return Err(ApiError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let username = req.username;
    let password = req.password;
    let (user_id, username) = blocking(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user_id = db
            .create_user(&username, &password_hash)?
            .ok_or_else(|| ApiError::Conflict("Username already in use".into()))?;
        Ok((user_id, username))
    })
    .await?;

    info!("Registered user {} ({})", username, user_id);

    // Registration logs the new user in.
    let (jar, token) = start_session(&state, jar, user_id, &username).await?;
    Ok((
        jar,
        Json(AuthResponse {
            message: "Registered successfully".into(),
            user_id,
            username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());

    let user = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_username(&req.username)? else {
            return Ok(None);
        };

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.id, e))?;
        let verified = Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_ok();

        Ok(verified.then_some(user))
    })
    .await?;

    let Some(user) = user else {
        warn!("Failed login attempt");
        return Err(invalid());
    };

    let (jar, token) = start_session(&state, jar, user.id, &user.username).await?;
    info!("Logged in as user {} ({})", user.username, user.id);

    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".into(),
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let sid = claims.sid.to_string();
    blocking(&state, move |db| Ok(db.delete_session(&sid)?)).await?;
    info!("User {} logged out", claims.username);

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(StatusMessage::new("Logged out"))))
}

pub async fn status(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<LoginStatus> {
    let logged_in = match authenticate(&state, &jar, &headers).await {
        Ok(claims) => claims.is_some(),
        Err(e) => {
            warn!("Session check failed: {}", e);
            false
        }
    };
    Json(LoginStatus { logged_in })
}

pub async fn current_user(Extension(claims): Extension<Claims>) -> Json<CurrentUser> {
    Json(CurrentUser {
        username: claims.username,
    })
}

/// Persist a new session, sign a token for it and attach it to `jar`.
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    username: &str,
) -> Result<(CookieJar, String), ApiError> {
    let sid = Uuid::new_v4();
    let expires_at = chrono::Utc::now() + state.session_ttl;

    let sid_str = sid.to_string();
    blocking(state, move |db| {
        // Opportunistic cleanup; sessions are short rows.
        db.purge_expired_sessions()?;
        db.create_session(&sid_str, user_id, expires_at)?;
        Ok(())
    })
    .await?;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        sid,
        exp: expires_at.timestamp() as usize,
    };
    let token = create_token(&state.jwt_secret, &claims)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), token))
}

pub fn create_token(secret: &str, claims: &Claims) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
