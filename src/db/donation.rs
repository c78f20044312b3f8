use super::DBClient;
use crate::dtos::DonationDto;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Donation table operations. Donations are append-only; there is no update
/// or delete path.
pub trait DonationExt {
    async fn create_donation(
        &self,
        user_id: Uuid,
        project_id: i32,
        amount: Decimal,
    ) -> Result<DonationDto, sqlx::Error>;

    async fn get_donations(
        &self,
        project_id: i32,
        page: i32,
        limit: i32,
    ) -> Result<Vec<DonationDto>, sqlx::Error>;

    /// Latest donations for the project detail page.
    async fn get_recent_donations(
        &self,
        project_id: i32,
        limit: i32,
    ) -> Result<Vec<DonationDto>, sqlx::Error>;

    /// Sum of all donations on a project, zero when there are none.
    async fn get_total_donations(&self, project_id: i32) -> Result<Decimal, sqlx::Error>;

    async fn get_project_donation_count(&self, project_id: i32) -> Result<i64, sqlx::Error>;

    async fn get_user_donation_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error>;
}

impl DonationExt for DBClient {
    async fn create_donation(
        &self,
        user_id: Uuid,
        project_id: i32,
        amount: Decimal,
    ) -> Result<DonationDto, sqlx::Error> {
        sqlx::query_as::<_, DonationDto>(
            r#"
            WITH new_donation AS (
                INSERT INTO donations (user_id, project_id, amount)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT nd.id, u.username AS user_username, nd.amount, nd.donated_at
            FROM new_donation nd
            INNER JOIN users u ON nd.user_id = u.id
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_donations(
        &self,
        project_id: i32,
        page: i32,
        limit: i32,
    ) -> Result<Vec<DonationDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        sqlx::query_as::<_, DonationDto>(
            r#"
            SELECT d.id, u.username AS user_username, d.amount, d.donated_at
            FROM donations d
            INNER JOIN users u ON d.user_id = u.id
            WHERE d.project_id = $1
            ORDER BY d.donated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_recent_donations(
        &self,
        project_id: i32,
        limit: i32,
    ) -> Result<Vec<DonationDto>, sqlx::Error> {
        self.get_donations(project_id, 1, limit).await
    }

    async fn get_total_donations(&self, project_id: i32) -> Result<Decimal, sqlx::Error> {
        let total = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(amount) FROM donations WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    async fn get_project_donation_count(&self, project_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM donations WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_user_donation_count(&self, user_id: &Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM donations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}
