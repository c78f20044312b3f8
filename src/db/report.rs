use super::DBClient;
use crate::models::ReportTarget;
use uuid::Uuid;

/// Report table operations. Reports are polymorphic over projects and
/// comments via the `report_type` tag and a pair of nullable foreign keys.
pub trait ReportExt {
    async fn create_report(
        &self,
        user_id: Uuid,
        target: ReportTarget,
        project_id: Option<i32>,
        comment_id: Option<i32>,
        reason: &str,
    ) -> Result<i32, sqlx::Error>;
}

impl ReportExt for DBClient {
    async fn create_report(
        &self,
        user_id: Uuid,
        target: ReportTarget,
        project_id: Option<i32>,
        comment_id: Option<i32>,
        reason: &str,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reports (user_id, report_type, project_id, comment_id, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(target)
        .bind(project_id)
        .bind(comment_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }
}
