mod error;
mod events;
mod models;
pub mod notify;
pub mod tags;

pub use error::DomainError;
pub use events::WallEvent;
pub use models::{
    validate_comment_text, validate_nest_name, Comment, Media, MediaKind, Nest, Notification,
    NotificationKind, UserProfile, Username, VoteKind, VoteTally,
};
