use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims carried by the session cookie (or a Bearer header).
/// `sid` points at a row in the sessions table so a logout can revoke the
/// token before `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub sid: Uuid,
    pub exp: usize,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginStatus {
    pub logged_in: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
}

// -- Users --

/// Public view of a user, as listed in friend lists and username lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCard {
    pub id: i64,
    pub username: String,
    #[serde(rename = "profileImg")]
    pub profile_img: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    #[serde(rename = "profileImg")]
    pub profile_img: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub username: String,
    pub work: String,
    pub education: String,
    pub hobbies: String,
    pub age: Option<i64>,
    pub location: String,
    pub bio: String,
    #[serde(rename = "profileImg")]
    pub profile_img: Option<String>,
}

/// Partial profile edit. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserInfoRequest {
    pub username: Option<String>,
    pub work: Option<String>,
    pub education: Option<String>,
    pub hobbies: Option<String>,
    pub age: Option<i64>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EducationSearchRequest {
    #[serde(default)]
    pub education: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

// -- Friends --

#[derive(Debug, Deserialize)]
pub struct SendFriendRequest {
    pub receiver_username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendFriendResponse {
    pub message: String,
    /// Set when a new pending request was stored.
    pub request_id: Option<i64>,
    /// True when the send collided with an opposite request and the two
    /// users became friends immediately.
    pub friends: bool,
}

/// `action` stays a string here so an unknown value surfaces as a 400
/// with a readable message instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct RespondFriendRequest {
    pub request_id: i64,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedRequest {
    pub id: i64,
    pub sender_username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentRequest {
    pub id: i64,
    pub receiver_username: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    pub received_requests: Vec<ReceivedRequest>,
    pub sent_requests: Vec<SentRequest>,
}
