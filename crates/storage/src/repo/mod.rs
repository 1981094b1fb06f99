pub mod comments;
mod nests;
mod notifications;
mod users;
mod votes;
