/// Database row types. These map directly to SQLite rows.
/// Distinct from amity-types API models to keep the DB layer independent.

use amity_types::models::UserInfo;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub profile_img: Option<String>,
    pub created_at: String,
}

pub struct UserInfoRow {
    pub user_id: i64,
    pub work: String,
    pub education: String,
    pub hobbies: String,
    pub age: Option<i64>,
    pub location: String,
    pub bio: String,
}

impl From<UserInfoRow> for UserInfo {
    fn from(row: UserInfoRow) -> Self {
        UserInfo {
            work: row.work,
            education: row.education,
            hobbies: row.hobbies,
            age: row.age,
            location: row.location,
            bio: row.bio,
        }
    }
}

pub struct FriendRequestRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub created_at: String,
}

/// A pending request joined with the username on the other side.
pub struct PendingRequestRow {
    pub id: i64,
    pub counterpart_username: String,
}

/// A friend as seen from one side of the pair.
pub struct FriendRow {
    pub id: i64,
    pub username: String,
    pub profile_img: Option<String>,
}
