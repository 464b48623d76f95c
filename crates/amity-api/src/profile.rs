use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;

use amity_types::api::{Claims, StatusMessage, UpdateUserInfoRequest, UserInfoResponse};
use amity_types::models::UserInfo;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// GET /api/user_info/{username}
///
/// Users who never edited their profile get empty fields.
pub async fn get_user_info(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserInfoResponse>, ApiError> {
    let (user, info) = blocking(&state, move |db| {
        let user = db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        let info = db.get_user_info(user.id)?.map(UserInfo::from).unwrap_or_default();
        Ok((user, info))
    })
    .await?;

    Ok(Json(UserInfoResponse {
        username: user.username,
        work: info.work,
        education: info.education,
        hobbies: info.hobbies,
        age: info.age,
        location: info.location,
        bio: info.bio,
        profile_img: user.profile_img,
    }))
}

/// POST /api/user_info
///
/// Edits the caller's own profile. A `username` in the body is accepted
/// only when it names the caller.
pub async fn update_user_info(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateUserInfoRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    if let Some(name) = &req.username {
        if *name != claims.username {
            return Err(ApiError::Forbidden("You can only edit your own profile".into()));
        }
    }

    let user_id = claims.sub;
    blocking(&state, move |db| {
        db.update_user_info(user_id, |info| info.apply(req).map_err(ApiError::from))?;
        Ok(())
    })
    .await?;

    info!("Profile of {} updated", claims.username);
    Ok(Json(StatusMessage::new("User info updated successfully")))
}
