use crate::models::{Comment, VoteTally};
use serde::{Deserialize, Serialize};

/// Changes pushed to live subscribers of a feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WallEvent {
    CommentPosted {
        comment: Comment,
    },
    CommentEdited {
        comment: Comment,
    },
    CommentDeleted {
        comment_id: String,
        nest_id: Option<String>,
    },
    VotesChanged {
        comment_id: String,
        nest_id: Option<String>,
        likes: i64,
        dislikes: i64,
    },
}

impl WallEvent {
    pub fn votes_changed(comment: &Comment, tally: &VoteTally) -> Self {
        Self::VotesChanged {
            comment_id: comment.id.clone(),
            nest_id: comment.nest_id.clone(),
            likes: tally.likes,
            dislikes: tally.dislikes,
        }
    }

    /// The feed the event belongs to; `None` is the public wall.
    pub fn nest_id(&self) -> Option<&str> {
        match self {
            Self::CommentPosted { comment } | Self::CommentEdited { comment } => {
                comment.nest_id.as_deref()
            }
            Self::CommentDeleted { nest_id, .. } | Self::VotesChanged { nest_id, .. } => {
                nest_id.as_deref()
            }
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::CommentPosted { .. } => "new_comment",
            Self::CommentEdited { .. } => "update_comment",
            Self::CommentDeleted { .. } => "delete_comment",
            Self::VotesChanged { .. } => "votes",
        }
    }

    /// JSON body sent as the SSE `data` field.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::CommentPosted { comment } | Self::CommentEdited { comment } => {
                serde_json::to_value(comment)
            }
            Self::CommentDeleted { comment_id, .. } => Ok(serde_json::json!({ "id": comment_id })),
            Self::VotesChanged {
                comment_id,
                likes,
                dislikes,
                ..
            } => Ok(serde_json::json!({ "id": comment_id, "likes": likes, "dislikes": dislikes })),
        }
    }
}
