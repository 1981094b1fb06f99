use crate::{models::SqlComment, repo::notifications::insert_notifications, Db};
use chrono::{DateTime, Utc};
use domain::{notify::NotificationDraft, Comment, Media, Username};
use sqlx::SqliteConnection;

// 投票列表与标签用 json_group_array 一次性聚合，避免 N+1 查询
const SELECT_COMMENT: &str = r#"
    SELECT
        c.id,
        c.username,
        c.content,
        c.created_at,
        c.edited_at,
        c.parent_id,
        c.nest_id,
        c.media_url,
        c.media_kind,
        c.is_deleted,
        (SELECT json_group_array(username) FROM comment_tags
         WHERE comment_id = c.id) AS tagged_users,
        (SELECT json_group_array(username) FROM comment_votes
         WHERE comment_id = c.id AND kind = 'like') AS liked_by,
        (SELECT json_group_array(username) FROM comment_votes
         WHERE comment_id = c.id AND kind = 'dislike') AS disliked_by,
        (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS reply_count
    FROM comments c
    LEFT JOIN nests n ON n.id = c.nest_id
"#;

// 公开墙、公开 nest，或者 viewer 是成员的私有 nest
const VISIBLE_TO_VIEWER: &str = r#"
    (c.nest_id IS NULL
     OR n.is_private = FALSE
     OR EXISTS (SELECT 1 FROM nest_members m WHERE m.nest_id = c.nest_id AND m.username = ?))
"#;

/// Which comment feed to read.
#[derive(Debug, Clone, Copy)]
pub enum Feed<'a> {
    /// Comments outside any nest.
    Wall,
    Nest(&'a str),
}

pub struct NewComment {
    pub author: Username,
    pub content: String,
    pub parent_id: Option<String>,
    pub nest_id: Option<String>,
    pub media: Option<Media>,
    pub tagged: Vec<Username>,
}

async fn replace_tags(
    conn: &mut SqliteConnection,
    comment_id: &str,
    tagged: &[Username],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM comment_tags WHERE comment_id = ?")
        .bind(comment_id)
        .execute(&mut *conn)
        .await?;

    for user in tagged {
        sqlx::query(
            r#"
            INSERT INTO comment_tags (comment_id, username)
            VALUES (?, ?)
            ON CONFLICT(comment_id, username) DO NOTHING
            "#,
        )
        .bind(comment_id)
        .bind(user.as_str())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn fetch_comment(conn: &mut SqliteConnection, id: &str) -> anyhow::Result<Option<Comment>> {
    let sql = format!("{SELECT_COMMENT} WHERE c.id = ?");
    let row = sqlx::query_as::<_, SqlComment>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(TryInto::try_into).transpose()
}

impl Db {
    /// Writes the comment, its tags, the notification fan-out and the
    /// author's last post time in a single transaction.
    pub async fn create_comment(
        &self,
        new: &NewComment,
        notifications: impl FnOnce(&str) -> Vec<NotificationDraft>,
    ) -> anyhow::Result<Comment> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO comments (
                id, username, content, created_at,
                parent_id, nest_id, media_url, media_kind, is_deleted
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, FALSE)
            "#,
        )
        .bind(&id)
        .bind(new.author.as_str())
        .bind(&new.content)
        .bind(now)
        .bind(&new.parent_id)
        .bind(&new.nest_id)
        .bind(new.media.as_ref().map(|m| m.url.as_str()))
        .bind(new.media.as_ref().map(|m| m.kind.as_str()))
        .execute(&mut *tx)
        .await?;

        replace_tags(&mut tx, &id, &new.tagged).await?;
        insert_notifications(&mut tx, &notifications(&id)).await?;

        sqlx::query("UPDATE users SET last_posted_at = ? WHERE username = ?")
            .bind(now)
            .bind(new.author.as_str())
            .execute(&mut *tx)
            .await?;

        let comment = fetch_comment(&mut tx, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("comment {} vanished inside its own transaction", id))?;

        tx.commit().await?;
        Ok(comment)
    }

    pub async fn get_comment(&self, id: &str) -> anyhow::Result<Option<Comment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_comment(&mut conn, id).await
    }

    /// Newest first, replies included. Returns the page and the feed size.
    pub async fn list_feed(
        &self,
        feed: Feed<'_>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Comment>, i64)> {
        let (filter, nest_id) = match feed {
            Feed::Wall => ("c.nest_id IS NULL", None),
            Feed::Nest(id) => ("c.nest_id = ?", Some(id)),
        };

        let sql = format!(
            "{SELECT_COMMENT} WHERE {filter} ORDER BY c.created_at DESC, c.rowid DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query_as::<_, SqlComment>(&sql);
        if let Some(id) = nest_id {
            query = query.bind(id);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM comments c WHERE {filter}");
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        if let Some(id) = nest_id {
            count_query = count_query.bind(id);
        }
        let (total,) = count_query.fetch_one(&self.pool).await?;

        let comments = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<anyhow::Result<Vec<Comment>>>()?;
        Ok((comments, total))
    }

    /// Direct replies, oldest first.
    pub async fn list_replies(&self, parent_id: &str) -> anyhow::Result<Vec<Comment>> {
        let sql = format!(
            "{SELECT_COMMENT} WHERE c.parent_id = ? ORDER BY c.created_at ASC, c.rowid ASC"
        );
        let rows = sqlx::query_as::<_, SqlComment>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Everything the viewer may read that was posted after `since`, oldest first.
    pub async fn comments_since(
        &self,
        since: DateTime<Utc>,
        viewer: &str,
    ) -> anyhow::Result<Vec<Comment>> {
        let sql = format!(
            "{SELECT_COMMENT} WHERE c.created_at > ? AND {VISIBLE_TO_VIEWER} ORDER BY c.created_at ASC, c.rowid ASC"
        );
        let rows = sqlx::query_as::<_, SqlComment>(&sql)
            .bind(since)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Replaces the text and tags of a live comment. Returns `None` when the
    /// comment is missing or deleted.
    pub async fn edit_comment(
        &self,
        id: &str,
        content: &str,
        tagged: &[Username],
        notifications: &[NotificationDraft],
    ) -> anyhow::Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE comments SET content = ?, edited_at = ? WHERE id = ? AND is_deleted = FALSE",
        )
        .bind(content)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        replace_tags(&mut tx, id, tagged).await?;
        insert_notifications(&mut tx, notifications).await?;

        let comment = fetch_comment(&mut tx, id).await?;
        tx.commit().await?;
        Ok(comment)
    }

    /// 软删除：保留 ID 以维持回复树结构，但清空内容、媒体、标签和投票
    pub async fn soft_delete_comment(&self, id: &str) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE comments
            SET content = '', media_url = NULL, media_kind = NULL, is_deleted = TRUE
            WHERE id = ? AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM comment_tags WHERE comment_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comment_votes WHERE comment_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
