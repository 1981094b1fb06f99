use chrono::{DateTime, Utc};
use domain::{Comment, Media, MediaKind, Nest, Notification, NotificationKind, UserProfile};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
    pub nest_id: Option<String>,
    pub media_url: Option<String>,
    pub media_kind: Option<String>,
    pub is_deleted: bool,

    // json_group_array 聚合出来的 JSON 数组
    pub tagged_users: String,
    pub liked_by: String,
    pub disliked_by: String,
    pub reply_count: i64,
}

impl TryFrom<SqlComment> for Comment {
    type Error = anyhow::Error;

    fn try_from(sql: SqlComment) -> Result<Self, Self::Error> {
        let liked_by: Vec<String> = serde_json::from_str(&sql.liked_by)?;
        let disliked_by: Vec<String> = serde_json::from_str(&sql.disliked_by)?;
        let media = match (sql.media_url, sql.media_kind) {
            (Some(url), Some(kind)) => Some(Media {
                url,
                kind: kind.parse::<MediaKind>()?,
            }),
            _ => None,
        };

        Ok(Comment {
            id: sql.id,
            username: sql.username,
            content: sql.content,
            created_at: sql.created_at,
            edited_at: sql.edited_at,
            parent_id: sql.parent_id,
            nest_id: sql.nest_id,
            media,
            tagged_users: serde_json::from_str(&sql.tagged_users)?,
            likes: liked_by.len(),
            dislikes: disliked_by.len(),
            liked_by,
            disliked_by,
            reply_count: sql.reply_count,
            deleted: sql.is_deleted,
        })
    }
}

#[derive(FromRow)]
pub struct SqlUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_posted_at: Option<DateTime<Utc>>,
}

impl From<SqlUser> for UserProfile {
    fn from(sql: SqlUser) -> Self {
        UserProfile {
            username: sql.username,
            created_at: sql.created_at,
            last_posted_at: sql.last_posted_at,
        }
    }
}

#[derive(FromRow)]
pub struct SqlNest {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub members: String,
}

impl TryFrom<SqlNest> for Nest {
    type Error = anyhow::Error;

    fn try_from(sql: SqlNest) -> Result<Self, Self::Error> {
        Ok(Nest {
            id: sql.id,
            name: sql.name,
            is_private: sql.is_private,
            created_by: sql.created_by,
            created_at: sql.created_at,
            members: serde_json::from_str(&sql.members)?,
        })
    }
}

#[derive(FromRow)]
pub struct SqlNotification {
    pub id: String,
    pub kind: String,
    pub actor: String,
    pub comment_id: Option<String>,
    pub nest_id: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SqlNotification> for Notification {
    type Error = anyhow::Error;

    fn try_from(sql: SqlNotification) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: sql.id,
            kind: sql.kind.parse::<NotificationKind>()?,
            actor: sql.actor,
            comment_id: sql.comment_id,
            nest_id: sql.nest_id,
            message: sql.message,
            read: sql.is_read,
            created_at: sql.created_at,
        })
    }
}
