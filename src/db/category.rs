use super::DBClient;
use crate::models::Category;

/// Category lookups for project forms and list filters.
pub trait CategoryExt {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    async fn category_exists(&self, category_id: i32) -> Result<bool, sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn category_exists(&self, category_id: i32) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
