use std::fmt;
use std::str::FromStr;

use crate::api::UpdateUserInfoRequest;

/// Maximum length, in characters, of the short profile fields.
pub const SHORT_FIELD_MAX: usize = 15;
pub const BIO_MAX: usize = 100;
pub const AGE_MAX: i64 = 300;

// -- Friend requests --

/// Resolution of a pending friend request. Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendAction {
    Accept,
    Decline,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid action '{0}'")]
pub struct InvalidAction(pub String);

impl FromStr for FriendAction {
    type Err = InvalidAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "decline" => Ok(Self::Decline),
            other => Err(InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for FriendAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Decline => f.write_str("decline"),
        }
    }
}

/// What a send ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A new pending request was stored.
    Requested { request_id: i64 },
    /// The receiver had already asked the sender; the two are now friends
    /// and the opposite request is gone.
    BecameFriends,
}

// -- Profiles --

/// Free-text profile extension of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub work: String,
    pub education: String,
    pub hobbies: String,
    pub age: Option<i64>,
    pub location: String,
    pub bio: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Age must be a number between 0 and 300")]
    AgeOutOfRange,
}

impl UserInfo {
    /// Merge a partial edit into this profile. Nothing is changed unless
    /// every supplied field passes validation.
    pub fn apply(&mut self, update: UpdateUserInfoRequest) -> Result<(), ProfileError> {
        check_len("Work", update.work.as_deref(), SHORT_FIELD_MAX)?;
        check_len("Education", update.education.as_deref(), SHORT_FIELD_MAX)?;
        check_len("Hobbies", update.hobbies.as_deref(), SHORT_FIELD_MAX)?;
        if let Some(age) = update.age {
            if !(0..=AGE_MAX).contains(&age) {
                return Err(ProfileError::AgeOutOfRange);
            }
        }
        check_len("Location", update.location.as_deref(), SHORT_FIELD_MAX)?;
        check_len("Bio", update.bio.as_deref(), BIO_MAX)?;

        if let Some(work) = update.work {
            self.work = work;
        }
        if let Some(education) = update.education {
            self.education = education;
        }
        if let Some(hobbies) = update.hobbies {
            self.hobbies = hobbies;
        }
        if update.age.is_some() {
            self.age = update.age;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        Ok(())
    }
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ProfileError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ProfileError::TooLong { field, max }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!("accept".parse::<FriendAction>().unwrap(), FriendAction::Accept);
        assert_eq!("decline".parse::<FriendAction>().unwrap(), FriendAction::Decline);
        assert!("Accept".parse::<FriendAction>().is_err());
        assert!("block".parse::<FriendAction>().is_err());
        assert!("".parse::<FriendAction>().is_err());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut info = UserInfo {
            work: "Baker".into(),
            bio: "old".into(),
            ..Default::default()
        };
        info.apply(UpdateUserInfoRequest {
            bio: Some("Likes bread".into()),
            age: Some(41),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(info.work, "Baker");
        assert_eq!(info.bio, "Likes bread");
        assert_eq!(info.age, Some(41));
    }

    #[test]
    fn test_apply_rejects_without_partial_write() {
        let mut info = UserInfo::default();
        let err = info
            .apply(UpdateUserInfoRequest {
                work: Some("Engineer".into()),
                location: Some("x".repeat(16)),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(err, ProfileError::TooLong { field: "Location", max: SHORT_FIELD_MAX });
        assert_eq!(info, UserInfo::default());
    }

    #[test]
    fn test_length_limits_count_chars() {
        let mut info = UserInfo::default();
        // 15 multi-byte chars is still within the limit
        info.apply(UpdateUserInfoRequest {
            hobbies: Some("é".repeat(15)),
            bio: Some("b".repeat(100)),
            ..Default::default()
        })
        .unwrap();

        let err = info
            .apply(UpdateUserInfoRequest {
                bio: Some("b".repeat(101)),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ProfileError::TooLong { field: "Bio", max: BIO_MAX });
    }

    #[test]
    fn test_age_bounds() {
        let mut info = UserInfo::default();
        for age in [0, 300] {
            info.apply(UpdateUserInfoRequest { age: Some(age), ..Default::default() })
                .unwrap();
        }
        for age in [-1, 301] {
            assert_eq!(
                info.apply(UpdateUserInfoRequest { age: Some(age), ..Default::default() }),
                Err(ProfileError::AgeOutOfRange)
            );
        }
        assert_eq!(info.age, Some(300));
    }
}
