use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const NEST_NAME_MIN: usize = 3;
const NEST_NAME_MAX: usize = 48;

/// Login name of a user. Only word characters are allowed so that every
/// username can be tagged with `@name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(s: impl Into<String>) -> Result<Self, DomainError> {
        let s = s.into();
        let len = s.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
            return Err(DomainError::InvalidUsername);
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DomainError::InvalidUsername);
        }
        Ok(Self(s))
    }

    /// For names read back from the database or a verified token.
    pub fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Usernames are unique regardless of case.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims the text and checks it against the configured length limit.
pub fn validate_comment_text(text: &str, max_len: usize) -> Result<String, DomainError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DomainError::EmptyComment);
    }
    if text.chars().count() > max_len {
        return Err(DomainError::CommentTooLong { max: max_len });
    }
    Ok(text.to_string())
}

pub fn validate_nest_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(NEST_NAME_MIN..=NEST_NAME_MAX).contains(&len) {
        return Err(DomainError::InvalidNestName);
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(DomainError::InvalidNestName);
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Link,
}

impl MediaKind {
    /// Guesses the kind from the extension of a URL path.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg") => Self::Image,
            Some("mp4" | "webm" | "mov" | "mkv") => Self::Video,
            Some("mp3" | "ogg" | "wav" | "flac" | "m4a") => Self::Audio,
            _ => Self::Link,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Link => "link",
        }
    }
}

impl FromStr for MediaKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "link" => Ok(Self::Link),
            other => Err(DomainError::UnknownVariant {
                kind: "media kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub username: String,
    #[serde(rename = "comment")]
    pub content: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
    pub nest_id: Option<String>,
    pub media: Option<Media>,
    pub tagged_users: Vec<String>,
    pub likes: usize,
    pub dislikes: usize,
    pub liked_by: Vec<String>,
    pub disliked_by: Vec<String>,
    pub reply_count: i64,
    pub deleted: bool,
}

impl Comment {
    pub fn is_authored_by(&self, user: &Username) -> bool {
        user.matches(&self.username)
    }

    pub fn vote_of(&self, user: &Username) -> Option<VoteKind> {
        if self.liked_by.iter().any(|u| user.matches(u)) {
            Some(VoteKind::Like)
        } else if self.disliked_by.iter().any(|u| user.matches(u)) {
            Some(VoteKind::Dislike)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl FromStr for VoteKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(DomainError::UnknownVariant {
                kind: "vote",
                value: other.to_string(),
            }),
        }
    }
}

/// Counters after a vote toggle, plus where the voter ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub likes: i64,
    pub dislikes: i64,
    pub vote: Option<VoteKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nest {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<String>,
}

impl Nest {
    pub fn has_member(&self, user: &Username) -> bool {
        self.members.iter().any(|m| user.matches(m))
    }

    /// Public nests are readable by anyone, private ones only by members.
    pub fn is_visible_to(&self, viewer: Option<&Username>) -> bool {
        !self.is_private || viewer.is_some_and(|u| self.has_member(u))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Tag,
    Reply,
    NestInvite,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Reply => "reply",
            Self::NestInvite => "nest_invite",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag" => Ok(Self::Tag),
            "reply" => Ok(Self::Reply),
            "nest_invite" => Ok(Self::NestInvite),
            other => Err(DomainError::UnknownVariant {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    #[serde(rename = "from")]
    pub actor: String,
    pub comment_id: Option<String>,
    pub nest_id: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_posted_at: Option<DateTime<Utc>>,
}
