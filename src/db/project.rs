use super::DBClient;
use crate::dtos::{ProjectDto, ProjectSummaryDto, SaveProjectDto};
use crate::models::Project;
use crate::utils::slugify::{slug_base, slug_candidate};
use uuid::Uuid;

const PROJECT_DTO_QUERY: &str = r#"
    SELECT p.id, p.title, p.details, p.category_id, c.name AS category_name,
           u.username AS creator_username, p.total_target, p.start_time, p.end_time,
           p.is_featured, p.is_cancelled, p.slug, p.created_at
    FROM projects p
    INNER JOIN categories c ON c.id = p.category_id
    INNER JOIN users u ON u.id = p.creator_id
"#;

const PROJECT_SUMMARY_QUERY: &str = r#"
    SELECT p.id, p.title, c.name AS category_name, u.username AS creator_username,
           p.total_target,
           COALESCE((SELECT SUM(d.amount) FROM donations d WHERE d.project_id = p.id), 0) AS total_donations,
           p.end_time, p.is_featured, p.is_cancelled, p.slug
    FROM projects p
    INNER JOIN categories c ON c.id = p.category_id
    INNER JOIN users u ON u.id = p.creator_id
"#;

/// Project table operations, including slug assignment and tag upkeep.
pub trait ProjectExt {
    /// Raw row for ownership and lifecycle checks.
    async fn get_project_record(&self, slug: &str) -> Result<Option<Project>, sqlx::Error>;

    /// Joined row for API responses.
    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<ProjectDto>, sqlx::Error>;

    /// Active projects (not cancelled, not past end time), newest first, with
    /// optional category filter and title/tag search.
    async fn get_projects(
        &self,
        page: i32,
        limit: i32,
        category: Option<i32>,
        search: Option<&str>,
    ) -> Result<Vec<ProjectSummaryDto>, sqlx::Error>;

    async fn get_project_count(
        &self,
        category: Option<i32>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error>;

    async fn get_featured_projects(&self, limit: i32) -> Result<Vec<ProjectSummaryDto>, sqlx::Error>;

    /// Caller's own projects for the dashboard, cancelled and expired included.
    async fn get_user_projects(&self, user_id: Uuid) -> Result<Vec<ProjectSummaryDto>, sqlx::Error>;

    async fn get_user_project_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Insert a project with a freshly generated slug and its tag set.
    async fn create_project(
        &self,
        creator_id: Uuid,
        body: &SaveProjectDto,
    ) -> Result<ProjectDto, sqlx::Error>;

    /// Replace the editable fields and the whole tag set. The slug is left
    /// untouched so project URLs stay stable.
    async fn edit_project(
        &self,
        project_id: i32,
        body: &SaveProjectDto,
    ) -> Result<ProjectDto, sqlx::Error>;

    async fn cancel_project(&self, project_id: i32) -> Result<(), sqlx::Error>;

    async fn get_project_tags(&self, project_id: i32) -> Result<Vec<String>, sqlx::Error>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error>;

    async fn project_exists(&self, project_id: i32) -> Result<bool, sqlx::Error>;

    /// Slugified title, retried with `-1`, `-2`, ... until no row claims it.
    /// Racy between check and insert; the unique index on `slug` is the
    /// backstop, surfacing as a unique violation on insert.
    async fn generate_slug(&self, title: &str) -> Result<String, sqlx::Error>;
}

impl ProjectExt for DBClient {
    async fn get_project_record(&self, slug: &str) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, details, category_id, total_target, start_time, end_time,
                   creator_id, is_featured, is_cancelled, slug, created_at
            FROM projects WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<ProjectDto>, sqlx::Error> {
        let query = format!("{} WHERE p.slug = $1", PROJECT_DTO_QUERY);

        sqlx::query_as::<_, ProjectDto>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_projects(
        &self,
        page: i32,
        limit: i32,
        category: Option<i32>,
        search: Option<&str>,
    ) -> Result<Vec<ProjectSummaryDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let query = format!(
            r#"{}
            WHERE p.is_cancelled = false AND p.end_time > NOW()
              AND ($1::int4 IS NULL OR p.category_id = $1)
              AND ($2::text IS NULL
                   OR p.title ILIKE '%' || $2 || '%'
                   OR EXISTS(
                       SELECT 1 FROM project_tags pt
                       INNER JOIN tags t ON t.id = pt.tag_id
                       WHERE pt.project_id = p.id AND t.name ILIKE '%' || $2 || '%'))
            ORDER BY p.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            PROJECT_SUMMARY_QUERY
        );

        sqlx::query_as::<_, ProjectSummaryDto>(&query)
            .bind(category)
            .bind(search)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_project_count(
        &self,
        category: Option<i32>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM projects p
            WHERE p.is_cancelled = false AND p.end_time > NOW()
              AND ($1::int4 IS NULL OR p.category_id = $1)
              AND ($2::text IS NULL
                   OR p.title ILIKE '%' || $2 || '%'
                   OR EXISTS(
                       SELECT 1 FROM project_tags pt
                       INNER JOIN tags t ON t.id = pt.tag_id
                       WHERE pt.project_id = p.id AND t.name ILIKE '%' || $2 || '%'))
            "#,
        )
        .bind(category)
        .bind(search)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_featured_projects(
        &self,
        limit: i32,
    ) -> Result<Vec<ProjectSummaryDto>, sqlx::Error> {
        let query = format!(
            r#"{}
            WHERE p.is_featured = true AND p.is_cancelled = false AND p.end_time > NOW()
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
            PROJECT_SUMMARY_QUERY
        );

        sqlx::query_as::<_, ProjectSummaryDto>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_user_projects(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummaryDto>, sqlx::Error> {
        let query = format!(
            "{} WHERE p.creator_id = $1 ORDER BY p.created_at DESC",
            PROJECT_SUMMARY_QUERY
        );

        sqlx::query_as::<_, ProjectSummaryDto>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_user_project_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE creator_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn create_project(
        &self,
        creator_id: Uuid,
        body: &SaveProjectDto,
    ) -> Result<ProjectDto, sqlx::Error> {
        let slug = self.generate_slug(&body.title).await?;

        let mut tx = self.pool.begin().await?;

        let project_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO projects (title, details, category_id, total_target, start_time, end_time, creator_id, slug)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&body.title)
        .bind(&body.details)
        .bind(body.category_id)
        .bind(body.total_target)
        .bind(body.start_time)
        .bind(body.end_time)
        .bind(creator_id)
        .bind(&slug)
        .fetch_one(&mut *tx)
        .await?;

        replace_tags(&mut tx, project_id, &body.tag_names()).await?;

        tx.commit().await?;

        let query = format!("{} WHERE p.id = $1", PROJECT_DTO_QUERY);
        sqlx::query_as::<_, ProjectDto>(&query)
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn edit_project(
        &self,
        project_id: i32,
        body: &SaveProjectDto,
    ) -> Result<ProjectDto, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET title = $1, details = $2, category_id = $3, total_target = $4,
                start_time = $5, end_time = $6
            WHERE id = $7
            "#,
        )
        .bind(&body.title)
        .bind(&body.details)
        .bind(body.category_id)
        .bind(body.total_target)
        .bind(body.start_time)
        .bind(body.end_time)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        replace_tags(&mut tx, project_id, &body.tag_names()).await?;

        tx.commit().await?;

        let query = format!("{} WHERE p.id = $1", PROJECT_DTO_QUERY);
        sqlx::query_as::<_, ProjectDto>(&query)
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn cancel_project(&self, project_id: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET is_cancelled = true WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn get_project_tags(&self, project_id: i32) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT t.name FROM tags t
            INNER JOIN project_tags pt ON pt.tag_id = t.id
            WHERE pt.project_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
    }

    async fn project_exists(&self, project_id: i32) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn generate_slug(&self, title: &str) -> Result<String, sqlx::Error> {
        let base = slug_base(title);

        let mut attempt = 0u32;
        loop {
            let candidate = slug_candidate(&base, attempt);
            if !self.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }
}

/// Wipe and re-insert the tag set for a project, get-or-creating tag rows by
/// name.
async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    project_id: i32,
    names: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM project_tags WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    for name in names {
        // DO UPDATE instead of DO NOTHING so RETURNING always yields the id
        let tag_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO project_tags (project_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
