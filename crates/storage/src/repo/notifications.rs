use crate::{models::SqlNotification, Db};
use chrono::Utc;
use domain::{notify::NotificationDraft, Notification};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Writes the drafts on an open connection so callers can batch them into
/// their own transaction.
pub(crate) async fn insert_notifications(
    conn: &mut SqliteConnection,
    drafts: &[NotificationDraft],
) -> anyhow::Result<()> {
    let now = Utc::now();
    for d in drafts {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient, kind, actor, comment_id, nest_id, message, is_read, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(d.recipient.as_str())
        .bind(d.kind.as_str())
        .bind(d.actor.as_str())
        .bind(&d.comment_id)
        .bind(&d.nest_id)
        .bind(&d.message)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl Db {
    pub async fn notify(&self, drafts: &[NotificationDraft]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_notifications(&mut *tx, drafts).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_notifications(
        &self,
        recipient: &str,
        unread_only: bool,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, SqlNotification>(
            r#"
            SELECT id, kind, actor, comment_id, nest_id, message, is_read, created_at
            FROM notifications
            WHERE recipient = ? AND (? = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(recipient)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn unread_count(&self, recipient: &str) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ? AND is_read = FALSE",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Marks the given ids (or everything when `ids` is `None`) as read.
    /// Ids belonging to other users are ignored.
    pub async fn mark_notifications_read(
        &self,
        recipient: &str,
        ids: Option<&[String]>,
    ) -> anyhow::Result<u64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "UPDATE notifications SET is_read = TRUE WHERE is_read = FALSE AND recipient = ",
        );
        qb.push_bind(recipient);

        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(0);
            }
            qb.push(" AND id IN (");
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_notifications(&self, recipient: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient = ?")
            .bind(recipient)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
