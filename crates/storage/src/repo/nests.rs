use crate::{models::SqlNest, Db};
use chrono::Utc;
use domain::{Nest, Username};

const SELECT_NEST: &str = r#"
    SELECT
        n.id,
        n.name,
        n.is_private,
        n.created_by,
        n.created_at,
        (SELECT json_group_array(m.username) FROM nest_members m
         WHERE m.nest_id = n.id) AS members
    FROM nests n
"#;

impl Db {
    /// Creates the nest with its creator as the first member. Returns `None`
    /// when the name is taken.
    pub async fn create_nest(
        &self,
        name: &str,
        is_private: bool,
        creator: &Username,
    ) -> anyhow::Result<Option<Nest>> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO nests (id, name, is_private, created_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(is_private)
        .bind(creator.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("INSERT INTO nest_members (nest_id, username, joined_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(creator.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let sql = format!("{SELECT_NEST} WHERE n.id = ?");
        let row = sqlx::query_as::<_, SqlNest>(&sql)
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row.try_into()?))
    }

    pub async fn get_nest(&self, id: &str) -> anyhow::Result<Option<Nest>> {
        let sql = format!("{SELECT_NEST} WHERE n.id = ?");
        let row = sqlx::query_as::<_, SqlNest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Public nests plus the private ones `viewer` belongs to, by name.
    pub async fn list_nests(&self, viewer: Option<&str>) -> anyhow::Result<Vec<Nest>> {
        let sql = format!(
            r#"{SELECT_NEST}
            WHERE n.is_private = FALSE
               OR EXISTS (SELECT 1 FROM nest_members m WHERE m.nest_id = n.id AND m.username = ?)
            ORDER BY n.name COLLATE NOCASE ASC"#
        );
        let rows = sqlx::query_as::<_, SqlNest>(&sql)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Returns `false` when the user already was a member.
    pub async fn add_nest_member(&self, nest_id: &str, user: &Username) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO nest_members (nest_id, username, joined_at)
            VALUES (?, ?, ?)
            ON CONFLICT(nest_id, username) DO NOTHING
            "#,
        )
        .bind(nest_id)
        .bind(user.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns `false` when the user was not a member.
    pub async fn remove_nest_member(&self, nest_id: &str, user: &Username) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM nest_members WHERE nest_id = ? AND username = ?")
            .bind(nest_id)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
