use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use amity_types::api::Claims;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "amity_session";

/// Reject the request with 401 unless it carries a live session, and hand
/// the verified identity to the handler as `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate(&state, &jar, req.headers())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Login required".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Resolve the caller's identity from the session cookie, falling back to
/// an `Authorization: Bearer` header when the cookie does not name a live
/// session. `Ok(None)` means anonymous: no token, tokens that fail
/// verification, or sessions that were revoked.
pub async fn authenticate(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<Option<Claims>, ApiError> {
    for token in candidate_tokens(jar, headers) {
        let Some(claims) = verify_token(&state.jwt_secret, &token) else {
            continue;
        };

        let sid = claims.sid.to_string();
        let user_id = claims.sub;
        let active = blocking(state, move |db| Ok(db.session_is_active(&sid, user_id)?)).await?;
        if active {
            return Ok(Some(claims));
        }
    }
    Ok(None)
}

/// Tokens the request carries, cookie first.
fn candidate_tokens(jar: &CookieJar, headers: &HeaderMap) -> Vec<String> {
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    cookie.into_iter().chain(bearer).collect()
}

pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
