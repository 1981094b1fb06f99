//! Who gets notified when a comment is posted, edited or a nest invite is sent.

use crate::models::{NotificationKind, Username};

/// A notification row that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient: Username,
    pub kind: NotificationKind,
    pub actor: Username,
    pub comment_id: Option<String>,
    pub nest_id: Option<String>,
    pub message: String,
}

/// The comment a fan-out is about.
#[derive(Debug, Clone, Copy)]
pub struct CommentRef<'a> {
    pub id: &'a str,
    pub nest_id: Option<&'a str>,
}

/// Plans the notifications for a freshly written comment.
///
/// The parent's author receives a reply notification; every tagged user
/// receives a tag notification. Nobody is notified about their own comment
/// and nobody receives both kinds for the same comment.
pub fn plan_comment_notifications(
    author: &Username,
    comment: CommentRef<'_>,
    tagged: &[Username],
    parent_author: Option<&Username>,
) -> Vec<NotificationDraft> {
    let mut drafts: Vec<NotificationDraft> = Vec::new();

    if let Some(parent_author) = parent_author {
        if !parent_author.matches(author.as_str()) {
            drafts.push(draft(
                parent_author,
                NotificationKind::Reply,
                author,
                comment,
                format!("@{} replied to your comment", author),
            ));
        }
    }

    for user in tagged {
        if user.matches(author.as_str()) {
            continue;
        }
        if drafts.iter().any(|d| d.recipient.matches(user.as_str())) {
            continue;
        }
        drafts.push(draft(
            user,
            NotificationKind::Tag,
            author,
            comment,
            format!("@{} tagged you in a comment", author),
        ));
    }

    drafts
}

/// Tags that appear in `current` but not in `previous`, compared without case.
pub fn newly_tagged(previous: &[String], current: &[Username]) -> Vec<Username> {
    current
        .iter()
        .filter(|u| !previous.iter().any(|p| u.matches(p)))
        .cloned()
        .collect()
}

pub fn nest_invite(
    inviter: &Username,
    invitee: &Username,
    nest_id: &str,
    nest_name: &str,
) -> NotificationDraft {
    NotificationDraft {
        recipient: invitee.clone(),
        kind: NotificationKind::NestInvite,
        actor: inviter.clone(),
        comment_id: None,
        nest_id: Some(nest_id.to_string()),
        message: format!("@{} added you to the nest \"{}\"", inviter, nest_name),
    }
}

fn draft(
    recipient: &Username,
    kind: NotificationKind,
    actor: &Username,
    comment: CommentRef<'_>,
    message: String,
) -> NotificationDraft {
    NotificationDraft {
        recipient: recipient.clone(),
        kind,
        actor: actor.clone(),
        comment_id: Some(comment.id.to_string()),
        nest_id: comment.nest_id.map(str::to_string),
        message,
    }
}
