//! Content Repository - users, publications, comments and categories

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::info;

use crate::database::store::{StoreError, StoreResult};
use crate::models::{
    Category, CategoryId, Comment, CommentId, OrganizationId, Publication, PublicationId, Role,
    User, UserId,
};

pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.users (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(150) NOT NULL UNIQUE,
                role VARCHAR(16) NOT NULL DEFAULT 'reader',
                authority DOUBLE PRECISION NOT NULL DEFAULT 0,
                rating DOUBLE PRECISION NOT NULL DEFAULT 0,
                vote_rating BIGINT NOT NULL DEFAULT 0,
                is_verified BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.categories (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                author_id BIGINT NOT NULL REFERENCES nestor.users(id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.publications (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                short_description TEXT NOT NULL DEFAULT '',
                author_id BIGINT NOT NULL REFERENCES nestor.users(id),
                organization_id BIGINT,
                rating BIGINT NOT NULL DEFAULT 0,
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.publication_categories (
                publication_id BIGINT NOT NULL REFERENCES nestor.publications(id) ON DELETE CASCADE,
                category_id BIGINT NOT NULL REFERENCES nestor.categories(id) ON DELETE CASCADE,
                PRIMARY KEY (publication_id, category_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.comments (
                id BIGSERIAL PRIMARY KEY,
                publication_id BIGINT NOT NULL REFERENCES nestor.publications(id) ON DELETE CASCADE,
                author_id BIGINT NOT NULL REFERENCES nestor.users(id),
                parent_id BIGINT REFERENCES nestor.comments(id) ON DELETE CASCADE,
                body TEXT NOT NULL,
                rating BIGINT NOT NULL DEFAULT 0,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_publication ON nestor.comments(publication_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_publications_author ON nestor.publications(author_id)")
            .execute(&self.pool)
            .await?;

        info!("Content tables initialized");
        Ok(())
    }

    pub async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            SELECT id, username, role, authority, rating, vote_rating, is_verified, created_at
            FROM nestor.users
            WHERE id = $1
        "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))?;

        user_from_row(&row)
    }

    pub async fn users_with_roles(&self, roles: &[Role]) -> StoreResult<Vec<User>> {
        let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, username, role, authority, rating, vote_rating, is_verified, created_at
            FROM nestor.users
            WHERE role = ANY($1)
            ORDER BY id
        "#,
        )
        .bind(&roles)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn save_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE nestor.users SET rating = $2, authority = $3 WHERE id = $1")
            .bind(user.id.get())
            .bind(user.rating)
            .bind(user.authority)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user.id));
        }
        Ok(())
    }

    pub async fn save_user_rating(&self, user: UserId, rating: f64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE nestor.users SET rating = $2 WHERE id = $1")
            .bind(user.get())
            .bind(rating)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user));
        }
        Ok(())
    }

    pub async fn get_publication(&self, id: PublicationId) -> StoreResult<Publication> {
        let row = sqlx::query(
            r#"
            SELECT id, title, short_description, author_id, organization_id,
                   rating, is_published, created_at, updated_at
            FROM nestor.publications
            WHERE id = $1
        "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("publication", id))?;

        let categories: Vec<i64> = sqlx::query_scalar(
            "SELECT category_id FROM nestor.publication_categories WHERE publication_id = $1 ORDER BY category_id",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        publication_from_row(&row, categories.into_iter().map(CategoryId).collect())
    }

    /// An author's publications, highest rated first
    pub async fn publications_by_author(&self, author: UserId) -> StoreResult<Vec<Publication>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, short_description, author_id, organization_id,
                   rating, is_published, created_at, updated_at
            FROM nestor.publications
            WHERE author_id = $1
            ORDER BY rating DESC, id
        "#,
        )
        .bind(author.get())
        .fetch_all(&self.pool)
        .await?;

        let links: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT pc.publication_id, pc.category_id
            FROM nestor.publication_categories pc
            JOIN nestor.publications p ON p.id = pc.publication_id
            WHERE p.author_id = $1
            ORDER BY pc.category_id
        "#,
        )
        .bind(author.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                let categories = links
                    .iter()
                    .filter(|(publication, _)| *publication == id)
                    .map(|(_, category)| CategoryId(*category))
                    .collect();
                publication_from_row(row, categories)
            })
            .collect()
    }

    pub async fn get_comment(&self, id: CommentId) -> StoreResult<Comment> {
        let row = sqlx::query(
            r#"
            SELECT id, publication_id, author_id, parent_id, body, rating, is_deleted, created_at
            FROM nestor.comments
            WHERE id = $1
        "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("comment", id))?;

        comment_from_row(&row)
    }

    pub async fn comments_for_publication(&self, id: PublicationId) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, publication_id, author_id, parent_id, body, rating, is_deleted, created_at
            FROM nestor.comments
            WHERE publication_id = $1
            ORDER BY created_at, id
        "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    pub async fn categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, title, slug, author_id FROM nestor.categories ORDER BY title")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId(row.try_get("id")?),
                    title: row.try_get("title")?,
                    slug: row.try_get("slug")?,
                    author: UserId(row.try_get("author_id")?),
                })
            })
            .collect()
    }
}

fn publication_from_row(row: &PgRow, categories: Vec<CategoryId>) -> StoreResult<Publication> {
    let organization: Option<i64> = row.try_get("organization_id")?;
    Ok(Publication {
        id: PublicationId(row.try_get("id")?),
        title: row.try_get("title")?,
        short_description: row.try_get("short_description")?,
        author: UserId(row.try_get("author_id")?),
        organization: organization.map(OrganizationId),
        categories,
        rating: row.try_get("rating")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", role)))?;

    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        role,
        authority: row.try_get("authority")?,
        rating: row.try_get("rating")?,
        vote_rating: row.try_get("vote_rating")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> StoreResult<Comment> {
    let parent: Option<i64> = row.try_get("parent_id")?;
    Ok(Comment {
        id: CommentId(row.try_get("id")?),
        publication: PublicationId(row.try_get("publication_id")?),
        author: UserId(row.try_get("author_id")?),
        parent: parent.map(CommentId),
        body: row.try_get("body")?,
        rating: row.try_get("rating")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
    })
}
