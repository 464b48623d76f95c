use axum::{Extension, Json, extract::State};
use tracing::debug;

use amity_types::api::{
    Claims, FriendRequestsResponse, ReceivedRequest, RespondFriendRequest, SendFriendRequest,
    SendFriendResponse, SentRequest, StatusMessage, UserCard,
};
use amity_types::models::{FriendAction, SendOutcome};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// POST /api/friend_request/send
pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendFriendRequest>,
) -> Result<Json<SendFriendResponse>, ApiError> {
    let sender_id = claims.sub;
    let outcome = blocking(&state, move |db| {
        Ok(db.send_friend_request(sender_id, &req.receiver_username)?)
    })
    .await?;

    let response = match outcome {
        SendOutcome::Requested { request_id } => SendFriendResponse {
            message: "Friend request sent".into(),
            request_id: Some(request_id),
            friends: false,
        },
        SendOutcome::BecameFriends => SendFriendResponse {
            message: "You are now friends!".into(),
            request_id: None,
            friends: true,
        },
    };
    Ok(Json(response))
}

/// POST /api/friend_request/respond
pub async fn respond_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<RespondFriendRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let responder_id = claims.sub;
    let action = blocking(&state, move |db| {
        Ok(db.respond_to_friend_request(responder_id, req.request_id, &req.action)?)
    })
    .await?;

    let message = match action {
        FriendAction::Accept => "Friend request accepted",
        FriendAction::Decline => "Friend request declined",
    };
    Ok(Json(StatusMessage::new(message)))
}

/// GET /api/friends
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserCard>>, ApiError> {
    let user_id = claims.sub;
    let rows = blocking(&state, move |db| Ok(db.list_friends(user_id)?)).await?;

    let friends = rows
        .into_iter()
        .map(|row| UserCard {
            id: row.id,
            username: row.username,
            profile_img: row.profile_img,
        })
        .collect();
    Ok(Json(friends))
}

/// GET /api/friend_requests
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FriendRequestsResponse>, ApiError> {
    let user_id = claims.sub;
    let (received, sent) =
        blocking(&state, move |db| Ok(db.list_pending_requests(user_id)?)).await?;

    let response = FriendRequestsResponse {
        received_requests: received
            .into_iter()
            .map(|r| ReceivedRequest {
                id: r.id,
                sender_username: r.counterpart_username,
            })
            .collect(),
        sent_requests: sent
            .into_iter()
            .map(|r| SentRequest {
                id: r.id,
                receiver_username: r.counterpart_username,
            })
            .collect(),
    };
    debug!(
        "{} has {} incoming and {} outgoing friend requests",
        claims.username,
        response.received_requests.len(),
        response.sent_requests.len()
    );
    Ok(Json(response))
}
