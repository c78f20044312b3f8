use super::DBClient;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Rating table operations. One row per (project, user); writes are upserts.
pub trait RatingExt {
    /// Insert or overwrite the caller's rating; the latest value wins.
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        project_id: i32,
        value: i32,
    ) -> Result<i32, sqlx::Error>;

    async fn get_user_rating(
        &self,
        user_id: Uuid,
        project_id: i32,
    ) -> Result<Option<i32>, sqlx::Error>;

    /// Mean rating, zero when unrated.
    async fn get_average_rating(&self, project_id: i32) -> Result<Decimal, sqlx::Error>;
}

impl RatingExt for DBClient {
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        project_id: i32,
        value: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO ratings (user_id, project_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id) DO UPDATE SET value = EXCLUDED.value
            RETURNING value
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_rating(
        &self,
        user_id: Uuid,
        project_id: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT value FROM ratings WHERE user_id = $1 AND project_id = $2",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_average_rating(&self, project_id: i32) -> Result<Decimal, sqlx::Error> {
        let avg = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT AVG(value) FROM ratings WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg.unwrap_or(Decimal::ZERO))
    }
}
