use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
};
use crate::domain::posts::{PostPatch, PostRecord};

use super::PostgresPostStore;
use super::util::map_sqlx_error;

const POST_COLUMNS: &str = "id, title, content, paragraphs, author_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    paragraphs: Vec<String>,
    author_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            paragraphs: row.paragraphs,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresPostStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1)"))
                .bind(ids.to_vec())
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_paragraph(&self, paragraph: &str) -> Result<Vec<PostRecord>, RepoError> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE $1 = ANY(paragraphs) ORDER BY created_at ASC, id ASC"
        ))
        .bind(paragraph)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError> {
        let limit = page.effective_limit() as i64;
        let offset = page.effective_offset() as i64;

        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        if let Some(cursor) = page.cursor {
            qb.push(" WHERE id > ");
            qb.push_bind(cursor);
        }
        qb.push(" ORDER BY created_at ASC, id ASC OFFSET ");
        qb.push_bind(offset);
        qb.push(" LIMIT ");
        qb.push_bind(limit);

        let rows: Vec<PostRow> = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        // The total deliberately ignores the cursor filter: it always answers
        // "how many posts exist", not "how many remain past the cursor".
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(PostRecord::from).collect(),
            Self::convert_count(total)?,
        ))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresPostStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts (title, content, paragraphs, author_id) \
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        ))
        .bind(&params.title)
        .bind(&params.content)
        .bind(&params.paragraphs)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<PostRecord, RepoError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "UPDATE posts SET \
                 title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 paragraphs = COALESCE($4, paragraphs), \
                 updated_at = clock_timestamp() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.content.as_deref())
        .bind(patch.paragraphs.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
