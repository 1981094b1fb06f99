use crate::Db;
use chrono::Utc;
use domain::{Username, VoteKind, VoteTally};

impl Db {
    /// Applies a like or dislike from `voter`.
    ///
    /// Repeating the current vote removes it, voting the other way switches
    /// it. Returns `None` when the comment is missing or deleted.
    pub async fn toggle_vote(
        &self,
        comment_id: &str,
        voter: &Username,
        kind: VoteKind,
    ) -> anyhow::Result<Option<VoteTally>> {
        let mut tx = self.pool.begin().await?;

        // 第一条语句必须是写操作：WAL 下读事务无法升级为写事务 (SQLITE_BUSY 不走 busy_timeout)
        let live = sqlx::query("UPDATE comments SET id = id WHERE id = ? AND is_deleted = FALSE")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        if live.rows_affected() == 0 {
            return Ok(None);
        }

        let current: Option<(String,)> = sqlx::query_as(
            "SELECT kind FROM comment_votes WHERE comment_id = ? AND username = ?",
        )
        .bind(comment_id)
        .bind(voter.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.map(|(k,)| k.parse::<VoteKind>()).transpose()?;

        let vote = if current == Some(kind) {
            sqlx::query("DELETE FROM comment_votes WHERE comment_id = ? AND username = ?")
                .bind(comment_id)
                .bind(voter.as_str())
                .execute(&mut *tx)
                .await?;
            None
        } else {
            sqlx::query(
                r#"
                INSERT INTO comment_votes (comment_id, username, kind, voted_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(comment_id, username) DO UPDATE SET
                    kind = excluded.kind,
                    voted_at = excluded.voted_at
                "#,
            )
            .bind(comment_id)
            .bind(voter.as_str())
            .bind(kind.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
            Some(kind)
        };

        let (likes, dislikes): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(kind = 'like'), 0),
                COALESCE(SUM(kind = 'dislike'), 0)
            FROM comment_votes
            WHERE comment_id = ?
            "#,
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(VoteTally {
            likes,
            dislikes,
            vote,
        }))
    }
}
