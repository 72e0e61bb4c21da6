use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::User;

pub struct Repository {
    pool: Arc<SqlitePool>,
}

impl Repository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetch the user, creating it with a zero balance on first contact.
    pub async fn get_or_create_user(&self, id_telegram: &str) -> Result<User, sqlx::Error> {
        if let Some(user) = self.get_user(id_telegram).await? {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id_telegram, summ_dolar)
            VALUES (?1, 0)
            ON CONFLICT (id_telegram) DO UPDATE SET id_telegram = excluded.id_telegram
            RETURNING *
            "#,
        )
        .bind(id_telegram)
        .fetch_one(self.pool())
        .await?;

        info!(user = %id_telegram, db_id = user.id, "New user created with balance 0");
        Ok(user)
    }

    pub async fn get_user(&self, id_telegram: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id_telegram = ?1")
            .bind(id_telegram)
            .fetch_optional(self.pool())
            .await
    }

    /// Non-transactional top-up; concurrent updates are last-writer-wins
    /// on the touched row.
    pub async fn add_balance(&self, id_telegram: &str, amount: f64) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET summ_dolar = summ_dolar + ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id_telegram = ?1
            RETURNING *
            "#,
        )
        .bind(id_telegram)
        .bind(amount)
        .fetch_one(self.pool())
        .await
    }
}
