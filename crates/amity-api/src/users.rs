use axum::{
    Json,
    extract::{Path, State},
};

use amity_types::api::{EducationSearchRequest, UserCard, UserSummary};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// GET /api/allusers
pub async fn all_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let rows = blocking(&state, |db| Ok(db.list_users()?)).await?;
    Ok(Json(
        rows.into_iter()
            .map(|u| UserSummary {
                username: u.username,
                profile_img: u.profile_img,
            })
            .collect(),
    ))
}

/// GET /api/user/username/{username}
pub async fn user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserCard>, ApiError> {
    let user = blocking(&state, move |db| Ok(db.get_user_by_username(&username)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserCard {
        id: user.id,
        username: user.username,
        profile_img: user.profile_img,
    }))
}

/// POST /api/users_by_education
pub async fn users_by_education(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EducationSearchRequest>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let term = req.education.trim().to_string();
    if term.is_empty() {
        return Err(ApiError::InvalidArgument("No education provided".into()));
    }

    let rows = blocking(&state, move |db| Ok(db.users_by_education(&term)?)).await?;
    Ok(Json(
        rows.into_iter()
            .map(|u| UserSummary {
                username: u.username,
                profile_img: u.profile_img,
            })
            .collect(),
    ))
}
