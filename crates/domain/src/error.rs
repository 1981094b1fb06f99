use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Username must be 3-32 characters of letters, digits or underscores.")]
    InvalidUsername,

    #[error("Nest name must be 3-48 characters of letters, digits, spaces, '-' or '_'.")]
    InvalidNestName,

    #[error("Comment cannot be empty.")]
    EmptyComment,

    #[error("Comment is too long (max {max} characters).")]
    CommentTooLong { max: usize },

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
