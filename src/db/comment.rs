use super::DBClient;
use crate::dtos::{CommentDto, CommentThreadDto};
use crate::models::Comment;
use uuid::Uuid;

/// Comment table operations. Threads are one level deep: a reply's
/// `parent_id` always points at a top-level comment.
pub trait CommentExt {
    /// Paginated top-level comments, newest first, each with its replies
    /// (oldest first) attached.
    async fn get_comment_threads(
        &self,
        project_id: i32,
        page: i32,
        limit: i32,
    ) -> Result<Vec<CommentThreadDto>, sqlx::Error>;

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error>;

    async fn create_comment(
        &self,
        user_id: Uuid,
        project_id: i32,
        content: &str,
        parent_id: Option<i32>,
    ) -> Result<CommentDto, sqlx::Error>;

    /// Count of top-level comments only, to match the thread pagination.
    async fn get_top_level_comment_count(&self, project_id: i32) -> Result<i64, sqlx::Error>;
}

impl CommentExt for DBClient {
    async fn get_comment_threads(
        &self,
        project_id: i32,
        page: i32,
        limit: i32,
    ) -> Result<Vec<CommentThreadDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let top_level = sqlx::query_as::<_, CommentDto>(
            r#"
            SELECT c.id, u.username AS user_username, c.content, c.parent_id, c.created_at
            FROM comments c
            INNER JOIN users u ON c.user_id = u.id
            WHERE c.project_id = $1 AND c.parent_id IS NULL
            ORDER BY c.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let parent_ids: Vec<i32> = top_level.iter().map(|c| c.id).collect();

        let replies = sqlx::query_as::<_, CommentDto>(
            r#"
            SELECT c.id, u.username AS user_username, c.content, c.parent_id, c.created_at
            FROM comments c
            INNER JOIN users u ON c.user_id = u.id
            WHERE c.parent_id = ANY($1)
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(&parent_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut threads: Vec<CommentThreadDto> = top_level
            .into_iter()
            .map(|comment| CommentThreadDto {
                comment,
                replies: Vec::new(),
            })
            .collect();

        for reply in replies {
            if let Some(parent_id) = reply.parent_id {
                if let Some(thread) = threads.iter_mut().find(|t| t.comment.id == parent_id) {
                    thread.replies.push(reply);
                }
            }
        }

        Ok(threads)
    }

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, project_id, user_id, content, parent_id, created_at FROM comments WHERE id = $1",
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_comment(
        &self,
        user_id: Uuid,
        project_id: i32,
        content: &str,
        parent_id: Option<i32>,
    ) -> Result<CommentDto, sqlx::Error> {
        sqlx::query_as::<_, CommentDto>(
            r#"
            WITH new_comment AS (
                INSERT INTO comments (user_id, project_id, content, parent_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT nc.id, u.username AS user_username, nc.content, nc.parent_id, nc.created_at
            FROM new_comment nc
            INNER JOIN users u ON nc.user_id = u.id
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(content)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_top_level_comment_count(&self, project_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE project_id = $1 AND parent_id IS NULL",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
    }
}
