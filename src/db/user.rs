use super::DBClient;
use crate::models::User;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, username, email, mobile_phone, password, role, verified, activation_token, token_expires_at, created_at, updated_at";

/// User table operations.
pub trait UserExt {
    /// Look a user up by exactly one of id, username, email, or activation
    /// token. Returns `None` when nothing matches.
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    /// Insert a new unverified user carrying an activation token.
    async fn save_user(
        &self,
        username: &str,
        email: &str,
        mobile_phone: &str,
        password: &str,
        activation_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<User, sqlx::Error>;

    async fn delete_user(&self, user_id: Uuid) -> Result<(), sqlx::Error>;

    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    async fn update_user_name(&self, user_id: Uuid, new_username: &str)
    -> Result<User, sqlx::Error>;

    async fn update_user_phone(
        &self,
        user_id: Uuid,
        new_phone: &str,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password: String,
    ) -> Result<User, sqlx::Error>;

    /// Activate the account behind a token and clear the token.
    async fn consume_activation_token(&self, token: &str) -> Result<(), sqlx::Error>;

    /// Clear a password-reset token. Leaves the verified flag alone, so a
    /// reset on a never-activated account does not activate it.
    async fn consume_reset_token(&self, token: &str) -> Result<(), sqlx::Error>;

    /// Attach a fresh token (password reset) to an existing user.
    async fn add_activation_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let (filter, value): (&str, String) = if let Some(user_id) = user_id {
            ("id = $1::uuid", user_id.to_string())
        } else if let Some(username) = username {
            ("username = $1", username.to_string())
        } else if let Some(email) = email {
            ("email = $1", email.to_string())
        } else if let Some(token) = token {
            ("activation_token = $1", token.to_string())
        } else {
            return Ok(None);
        };

        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter);

        sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page - 1) * limit as u32;

        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
    }

    async fn save_user(
        &self,
        username: &str,
        email: &str,
        mobile_phone: &str,
        password: &str,
        activation_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, mobile_phone, password, activation_token, token_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .bind(mobile_phone)
            .bind(password)
            .bind(activation_token)
            .bind(token_expires_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn update_user_name(
        &self,
        user_id: Uuid,
        new_username: &str,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "UPDATE users SET username = $1, updated_at = Now() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(new_username)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_user_phone(
        &self,
        user_id: Uuid,
        new_phone: &str,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "UPDATE users SET mobile_phone = $1, updated_at = Now() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(new_phone)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        new_password: String,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "UPDATE users SET password = $1, updated_at = Now() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(new_password)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn consume_activation_token(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET verified = true,
                updated_at = Now(),
                activation_token = NULL,
                token_expires_at = NULL
            WHERE activation_token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_reset_token(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET updated_at = Now(),
                activation_token = NULL,
                token_expires_at = NULL
            WHERE activation_token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_activation_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET activation_token = $1, token_expires_at = $2, updated_at = Now() WHERE id = $3",
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
