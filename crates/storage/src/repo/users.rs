use crate::{models::SqlUser, Db};
use chrono::Utc;
use domain::{UserProfile, Username};

impl Db {
    /// Returns `false` when the name is already taken (in any letter case).
    pub async fn create_user(&self, username: &Username, password_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(username) DO NOTHING
            "#,
        )
        .bind(username.as_str())
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Canonical username and password hash, for login.
    pub async fn find_credentials(&self, username: &str) -> anyhow::Result<Option<(Username, String)>> {
        let row = self.find_user(username).await?;
        Ok(row.map(|u| (Username::new_unchecked(u.username), u.password_hash)))
    }

    pub async fn get_profile(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.find_user(username).await?.map(Into::into))
    }

    /// Resolves tagged names to the users that exist, with their stored casing.
    pub async fn resolve_usernames(&self, names: &[String]) -> anyhow::Result<Vec<Username>> {
        let mut found = Vec::with_capacity(names.len());
        for name in names {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT username FROM users WHERE username = ?")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some((canonical,)) = row {
                found.push(Username::new_unchecked(canonical));
            }
        }
        Ok(found)
    }

    async fn find_user(&self, username: &str) -> anyhow::Result<Option<SqlUser>> {
        let row = sqlx::query_as::<_, SqlUser>(
            r#"
            SELECT username, password_hash, created_at, last_posted_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
