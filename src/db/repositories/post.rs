//! Post repository
//!
//! Database operations for posts and sheets.
//!
//! This module provides:
//! - `CrudRepository` trait, the generic create/read/update/delete seam
//! - `PostRepository` trait adding counters and post-specific queries
//! - `SqlxPostRepository` implementing both for SQLite and MySQL
//!
//! Every variant lives in the `posts` table; each repository instance only
//! ever sees the rows whose `post_type` matches `P::KIND`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{BasePost, Entity, Page, Pageable, PostEntity, PostStatus, Sort};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlQueryResult;
use sqlx::sqlite::SqliteQueryResult;
use std::marker::PhantomData;
use std::sync::Arc;

/// Generic data access for a stored entity
#[async_trait]
pub trait CrudRepository<T: Entity>: Send + Sync {
    /// One page of every row, ordered by the pageable's sort
    async fn find_all(&self, pageable: &Pageable) -> Result<Page<T>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<T>>;

    async fn exists_by_id(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Insert a new row and return it with its assigned id
    async fn insert(&self, entity: &T) -> Result<T>;

    /// Overwrite an existing row, returning the stored state or `None` if
    /// no row has the entity's id
    async fn update(&self, entity: &T) -> Result<Option<T>>;

    /// Delete by id, returning the number of rows removed
    async fn delete_by_id(&self, id: i64) -> Result<u64>;
}

/// Post-specific queries on top of `CrudRepository`
#[async_trait]
pub trait PostRepository<P: PostEntity>: CrudRepository<P> {
    /// Sum of visits, `None` when there are no rows
    async fn count_visit(&self) -> Result<Option<i64>>;

    /// Sum of likes, `None` when there are no rows
    async fn count_like(&self) -> Result<Option<i64>>;

    async fn count_by_status(&self, status: PostStatus) -> Result<i64>;

    async fn get_by_url(&self, url: &str) -> Result<Option<P>>;

    async fn get_by_url_and_status(&self, url: &str, status: PostStatus) -> Result<Option<P>>;

    async fn find_all_by_status(&self, status: PostStatus, sort: &Sort) -> Result<Vec<P>>;

    async fn find_all_by_status_paged(
        &self,
        status: PostStatus,
        pageable: &Pageable,
    ) -> Result<Page<P>>;

    /// Rows with the given status created strictly after `time`
    async fn find_all_by_status_and_create_time_after(
        &self,
        status: PostStatus,
        time: DateTime<Utc>,
        pageable: &Pageable,
    ) -> Result<Page<P>>;

    /// Rows with the given status created strictly before `time`
    async fn find_all_by_status_and_create_time_before(
        &self,
        status: PostStatus,
        time: DateTime<Utc>,
        pageable: &Pageable,
    ) -> Result<Page<P>>;

    /// Add `amount` to the visit counter, returning affected rows. A row whose
    /// counter would overflow is not updated.
    async fn update_visit(&self, amount: i64, id: i64) -> Result<u64>;

    /// Add `amount` to the like counter, returning affected rows
    async fn update_likes(&self, amount: i64, id: i64) -> Result<u64>;

    async fn count_by_url(&self, url: &str) -> Result<i64>;

    /// Count rows using `url` other than the one with `id`
    async fn count_by_id_not_and_url(&self, id: i64, url: &str) -> Result<i64>;
}

const COLUMNS: &str = "id, title, url, status, original_content, format_content, summary, \
     thumbnail, password, template, disallow_comment, top_priority, visits, likes, \
     create_time, update_time, edit_time";

/// Row shape shared by both drivers
#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    url: String,
    status: i32,
    original_content: String,
    format_content: String,
    summary: String,
    thumbnail: Option<String>,
    password: Option<String>,
    template: Option<String>,
    disallow_comment: bool,
    top_priority: i32,
    visits: i64,
    likes: i64,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    edit_time: Option<DateTime<Utc>>,
}

impl TryFrom<PostRow> for BasePost {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let status = PostStatus::from_code(row.status)
            .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", row.status))?;

        Ok(BasePost {
            id: row.id.into(),
            title: row.title,
            url: row.url,
            status,
            original_content: row.original_content,
            format_content: row.format_content,
            summary: row.summary,
            thumbnail: row.thumbnail,
            password: row.password,
            template: row.template,
            disallow_comment: row.disallow_comment,
            top_priority: row.top_priority,
            visits: row.visits,
            likes: row.likes,
            create_time: row.create_time,
            update_time: row.update_time,
            edit_time: row.edit_time,
        })
    }
}

/// Id assigned by the database to an inserted row
trait InsertedId {
    fn inserted_id(&self) -> i64;
}

impl InsertedId for SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertedId for MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

/// Run `$body` against whichever pool backs `$pool`, bound to `$conn`.
///
/// The SQL in this module is portable between SQLite and MySQL, so one body
/// serves both drivers.
macro_rules! on_pool {
    ($pool:expr, |$conn:ident| $body:expr) => {
        match $pool.driver() {
            DatabaseDriver::Sqlite => {
                let $conn = $pool.as_sqlite().context("SQLite pool unavailable")?;
                $body
            }
            DatabaseDriver::Mysql => {
                let $conn = $pool.as_mysql().context("MySQL pool unavailable")?;
                $body
            }
        }
    };
}

/// SQLx-based repository for one post variant
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository<P> {
    pool: DynDatabasePool,
    _variant: PhantomData<fn() -> P>,
}

impl<P: PostEntity> SqlxPostRepository<P> {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            pool,
            _variant: PhantomData,
        }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository<P>> {
        Arc::new(Self::new(pool))
    }

    fn kind() -> i32 {
        P::KIND.code()
    }

    fn to_entities(rows: Vec<PostRow>) -> Result<Vec<P>> {
        rows.into_iter()
            .map(|row| BasePost::try_from(row).map(P::from_base))
            .collect()
    }

    fn to_entity(row: Option<PostRow>) -> Result<Option<P>> {
        row.map(|row| BasePost::try_from(row).map(P::from_base))
            .transpose()
    }

    /// Sum a counter column; MySQL returns DECIMAL for SUM so it is cast back
    async fn sum_column(&self, column: &str) -> Result<Option<i64>> {
        let sum = match self.pool.driver() {
            DatabaseDriver::Sqlite => format!("SUM({})", column),
            DatabaseDriver::Mysql => format!("CAST(SUM({}) AS SIGNED)", column),
        };
        let sql = format!("SELECT {} FROM posts WHERE post_type = ?", sum);

        let total: Option<i64> = on_pool!(self.pool, |conn| {
            sqlx::query_scalar(&sql)
                .bind(Self::kind())
                .fetch_one(conn)
                .await
                .with_context(|| format!("Failed to sum {}", column))?
        });
        Ok(total)
    }

    /// Add `amount` to a counter column. Rows where the sum would overflow
    /// `i64` are left untouched and not counted as affected.
    async fn increment_column(&self, column: &str, amount: i64, id: i64) -> Result<u64> {
        let sql = format!(
            "UPDATE posts SET {col} = {col} + ? WHERE id = ? AND post_type = ? AND {col} <= ? - ?",
            col = column
        );

        let affected = on_pool!(self.pool, |conn| {
            sqlx::query(&sql)
                .bind(amount)
                .bind(id)
                .bind(Self::kind())
                .bind(i64::MAX)
                .bind(amount)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to increase {} of post {}", column, id))?
                .rows_affected()
        });
        Ok(affected)
    }

    async fn find_page_by_status_and_create_time(
        &self,
        status: PostStatus,
        operator: &str,
        time: DateTime<Utc>,
        pageable: &Pageable,
    ) -> Result<Page<P>> {
        let filter = format!(
            "WHERE post_type = ? AND status = ? AND create_time {} ?",
            operator
        );
        let count_sql = format!("SELECT COUNT(*) FROM posts {}", filter);
        let select_sql = format!(
            "SELECT {} FROM posts {} {} LIMIT ? OFFSET ?",
            COLUMNS,
            filter,
            pageable.sort.to_order_by()
        );

        let (total, rows): (i64, Vec<PostRow>) = on_pool!(self.pool, |conn| {
            let total: i64 = sqlx::query_scalar(&count_sql)
                .bind(Self::kind())
                .bind(status.code())
                .bind(time)
                .fetch_one(conn)
                .await
                .context("Failed to count posts by create time")?;
            let rows: Vec<PostRow> = sqlx::query_as(&select_sql)
                .bind(Self::kind())
                .bind(status.code())
                .bind(time)
                .bind(pageable.limit())
                .bind(pageable.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list posts by create time")?;
            (total, rows)
        });

        Ok(Page::new(
            Self::to_entities(rows)?,
            total.max(0) as u64,
            pageable,
        ))
    }
}

#[async_trait]
impl<P: PostEntity> CrudRepository<P> for SqlxPostRepository<P> {
    async fn find_all(&self, pageable: &Pageable) -> Result<Page<P>> {
        let select_sql = format!(
            "SELECT {} FROM posts WHERE post_type = ? {} LIMIT ? OFFSET ?",
            COLUMNS,
            pageable.sort.to_order_by()
        );

        let rows: Vec<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&select_sql)
                .bind(Self::kind())
                .bind(pageable.limit())
                .bind(pageable.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list posts")?
        });
        let total = self.count().await?;

        Ok(Page::new(
            Self::to_entities(rows)?,
            total.max(0) as u64,
            pageable,
        ))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<P>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ? AND post_type = ?", COLUMNS);

        let row: Option<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&sql)
                .bind(id)
                .bind(Self::kind())
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get post by id: {}", id))?
        });
        Self::to_entity(row)
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool> {
        let count: i64 = on_pool!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ? AND post_type = ?")
                .bind(id)
                .bind(Self::kind())
                .fetch_one(conn)
                .await
                .context("Failed to check post existence")?
        });
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE post_type = ?")
                .bind(Self::kind())
                .fetch_one(conn)
                .await
                .context("Failed to count posts")?
        });
        Ok(count)
    }

    async fn insert(&self, entity: &P) -> Result<P> {
        let post = entity.base();

        let id = on_pool!(self.pool, |conn| {
            sqlx::query(
                r#"
                INSERT INTO posts (post_type, title, url, status, original_content, format_content, summary, thumbnail, password, template, disallow_comment, top_priority, visits, likes, create_time, update_time, edit_time)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Self::kind())
            .bind(&post.title)
            .bind(&post.url)
            .bind(post.status.code())
            .bind(&post.original_content)
            .bind(&post.format_content)
            .bind(&post.summary)
            .bind(&post.thumbnail)
            .bind(&post.password)
            .bind(&post.template)
            .bind(post.disallow_comment)
            .bind(post.top_priority)
            .bind(post.visits)
            .bind(post.likes)
            .bind(post.create_time)
            .bind(post.update_time)
            .bind(post.edit_time)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to create {}: {}", P::NAME, post.url))?
            .inserted_id()
        });

        tracing::debug!(id, url = %post.url, "Inserted {}", P::NAME);

        let mut created = entity.clone();
        created.base_mut().id = id.into();
        Ok(created)
    }

    async fn update(&self, entity: &P) -> Result<Option<P>> {
        let post = entity.base();
        let id = post
            .id
            .value()
            .ok_or_else(|| anyhow::anyhow!("Cannot update a {} without an id", P::NAME))?;

        let affected = on_pool!(self.pool, |conn| {
            sqlx::query(
                r#"
                UPDATE posts
                SET title = ?, url = ?, status = ?, original_content = ?, format_content = ?, summary = ?, thumbnail = ?, password = ?, template = ?, disallow_comment = ?, top_priority = ?, update_time = ?, edit_time = ?
                WHERE id = ? AND post_type = ?
                "#,
            )
            .bind(&post.title)
            .bind(&post.url)
            .bind(post.status.code())
            .bind(&post.original_content)
            .bind(&post.format_content)
            .bind(&post.summary)
            .bind(&post.thumbnail)
            .bind(&post.password)
            .bind(&post.template)
            .bind(post.disallow_comment)
            .bind(post.top_priority)
            .bind(post.update_time)
            .bind(post.edit_time)
            .bind(id)
            .bind(Self::kind())
            .execute(conn)
            .await
            .with_context(|| format!("Failed to update {}: {}", P::NAME, id))?
            .rows_affected()
        });

        // MySQL reports zero affected rows when nothing changed, so the
        // stored row decides whether the update hit anything.
        if affected == 0 && !self.exists_by_id(id).await? {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<u64> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM posts WHERE id = ? AND post_type = ?")
                .bind(id)
                .bind(Self::kind())
                .execute(conn)
                .await
                .with_context(|| format!("Failed to delete post: {}", id))?
                .rows_affected()
        });
        Ok(affected)
    }
}

#[async_trait]
impl<P: PostEntity> PostRepository<P> for SqlxPostRepository<P> {
    async fn count_visit(&self) -> Result<Option<i64>> {
        self.sum_column("visits").await
    }

    async fn count_like(&self) -> Result<Option<i64>> {
        self.sum_column("likes").await
    }

    async fn count_by_status(&self, status: PostStatus) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE post_type = ? AND status = ?")
                .bind(Self::kind())
                .bind(status.code())
                .fetch_one(conn)
                .await
                .context("Failed to count posts by status")?
        });
        Ok(count)
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<P>> {
        let sql = format!("SELECT {} FROM posts WHERE url = ? AND post_type = ?", COLUMNS);

        let row: Option<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&sql)
                .bind(url)
                .bind(Self::kind())
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get post by url: {}", url))?
        });
        Self::to_entity(row)
    }

    async fn get_by_url_and_status(&self, url: &str, status: PostStatus) -> Result<Option<P>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE url = ? AND status = ? AND post_type = ?",
            COLUMNS
        );

        let row: Option<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&sql)
                .bind(url)
                .bind(status.code())
                .bind(Self::kind())
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get {} post by url: {}", status, url))?
        });
        Self::to_entity(row)
    }

    async fn find_all_by_status(&self, status: PostStatus, sort: &Sort) -> Result<Vec<P>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE post_type = ? AND status = ? {}",
            COLUMNS,
            sort.to_order_by()
        );

        let rows: Vec<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&sql)
                .bind(Self::kind())
                .bind(status.code())
                .fetch_all(conn)
                .await
                .context("Failed to list posts by status")?
        });
        Self::to_entities(rows)
    }

    async fn find_all_by_status_paged(
        &self,
        status: PostStatus,
        pageable: &Pageable,
    ) -> Result<Page<P>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE post_type = ? AND status = ? {} LIMIT ? OFFSET ?",
            COLUMNS,
            pageable.sort.to_order_by()
        );

        let rows: Vec<PostRow> = on_pool!(self.pool, |conn| {
            sqlx::query_as(&sql)
                .bind(Self::kind())
                .bind(status.code())
                .bind(pageable.limit())
                .bind(pageable.offset())
                .fetch_all(conn)
                .await
                .context("Failed to page posts by status")?
        });
        let total = self.count_by_status(status).await?;

        Ok(Page::new(
            Self::to_entities(rows)?,
            total.max(0) as u64,
            pageable,
        ))
    }

    async fn find_all_by_status_and_create_time_after(
        &self,
        status: PostStatus,
        time: DateTime<Utc>,
        pageable: &Pageable,
    ) -> Result<Page<P>> {
        self.find_page_by_status_and_create_time(status, ">", time, pageable)
            .await
    }

    async fn find_all_by_status_and_create_time_before(
        &self,
        status: PostStatus,
        time: DateTime<Utc>,
        pageable: &Pageable,
    ) -> Result<Page<P>> {
        self.find_page_by_status_and_create_time(status, "<", time, pageable)
            .await
    }

    async fn update_visit(&self, amount: i64, id: i64) -> Result<u64> {
        self.increment_column("visits", amount, id).await
    }

    async fn update_likes(&self, amount: i64, id: i64) -> Result<u64> {
        self.increment_column("likes", amount, id).await
    }

    async fn count_by_url(&self, url: &str) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, |conn| {
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE post_type = ? AND url = ?")
                .bind(Self::kind())
                .bind(url)
                .fetch_one(conn)
                .await
                .context("Failed to count posts by url")?
        });
        Ok(count)
    }

    async fn count_by_id_not_and_url(&self, id: i64, url: &str) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, |conn| {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM posts WHERE post_type = ? AND id <> ? AND url = ?",
            )
            .bind(Self::kind())
            .bind(id)
            .bind(url)
            .fetch_one(conn)
            .await
            .context("Failed to count posts by url")?
        });
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Id, Order, Post, Sheet, SortField};
    use chrono::Duration;

    async fn setup_test_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository<Post>) {
        let pool = setup_test_pool().await;
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn published(url: &str, create_time: DateTime<Utc>) -> Post {
        let mut post = Post::from(
            BasePost::new(format!("Title {}", url), url, format!("Content {}", url))
                .with_status(PostStatus::Published),
        );
        post.create_time = create_time;
        post.update_time = create_time;
        post
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo
            .insert(&Post::new("Hello", "hello", "# Hello"))
            .await
            .expect("Failed to insert post");

        assert!(created.id.is_assigned());
        assert_eq!(created.url, "hello");

        let found = repo
            .find_by_id(created.id.value().unwrap())
            .await
            .unwrap()
            .expect("Post not found");
        assert_eq!(found.title, "Hello");
        assert_eq!(found.status, PostStatus::Draft);
        assert_eq!(found.create_time, created.create_time);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.find_by_id(99_999).await.unwrap().is_none());
        assert!(!repo.exists_by_id(99_999).await.unwrap());
    }

    #[tokio::test]
    async fn test_variants_are_isolated() {
        let pool = setup_test_pool().await;
        let posts = SqlxPostRepository::<Post>::new(pool.clone());
        let sheets = SqlxPostRepository::<Sheet>::new(pool.clone());

        let sheet = sheets
            .insert(&Sheet::new("About", "about", "me"))
            .await
            .unwrap();
        let sheet_id = sheet.id.value().unwrap();

        assert_eq!(posts.count().await.unwrap(), 0);
        assert!(posts.find_by_id(sheet_id).await.unwrap().is_none());
        assert!(posts.get_by_url("about").await.unwrap().is_none());
        assert_eq!(posts.count_by_url("about").await.unwrap(), 0);
        assert_eq!(posts.update_visit(1, sheet_id).await.unwrap(), 0);

        // Same url is free for the other variant
        posts
            .insert(&Post::new("About post", "about", "post"))
            .await
            .expect("Same url should be allowed for a post");
        assert_eq!(sheets.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_counters_and_create_time() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.insert(&Post::new("Old", "old", "old")).await.unwrap();
        let id = created.id.value().unwrap();

        assert_eq!(repo.update_visit(7, id).await.unwrap(), 1);

        let mut changed = created.clone();
        changed.title = "New".to_string();
        changed.url = "new".to_string();
        changed.visits = 0;
        changed.create_time = Utc::now() + Duration::days(3);
        changed.edit_time = Some(Utc::now());

        let updated = repo
            .update(&changed)
            .await
            .unwrap()
            .expect("Updated post should exist");

        assert_eq!(updated.title, "New");
        assert_eq!(updated.url, "new");
        assert_eq!(updated.visits, 7);
        assert_eq!(updated.create_time, created.create_time);
        assert!(updated.edit_time.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let (_pool, repo) = setup_test_repo().await;
        let mut ghost = Post::new("Ghost", "ghost", "boo");
        ghost.id = Id::Assigned(4242);

        assert!(repo.update(&ghost).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counters() {
        let (_pool, repo) = setup_test_repo().await;
        assert_eq!(repo.count_visit().await.unwrap(), None);

        let a = repo.insert(&Post::new("A", "a", "a")).await.unwrap();
        let b = repo.insert(&Post::new("B", "b", "b")).await.unwrap();
        let (a, b) = (a.id.value().unwrap(), b.id.value().unwrap());

        assert_eq!(repo.update_visit(5, a).await.unwrap(), 1);
        assert_eq!(repo.update_visit(2, b).await.unwrap(), 1);
        assert_eq!(repo.update_likes(3, a).await.unwrap(), 1);
        assert_eq!(repo.update_likes(1, 12345).await.unwrap(), 0);

        assert_eq!(repo.count_visit().await.unwrap(), Some(7));
        assert_eq!(repo.count_like().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_increment_stops_at_i64_max() {
        let (_pool, repo) = setup_test_repo().await;
        let post = repo.insert(&Post::new("Busy", "busy", "busy")).await.unwrap();
        let id = post.id.value().unwrap();

        assert_eq!(repo.update_visit(i64::MAX, id).await.unwrap(), 1);
        assert_eq!(repo.update_visit(1, id).await.unwrap(), 0);
        assert_eq!(repo.update_likes(i64::MAX - 1, id).await.unwrap(), 1);
        assert_eq!(repo.update_likes(1, id).await.unwrap(), 1);
        assert_eq!(repo.update_likes(1, id).await.unwrap(), 0);

        let stored = repo.find_by_id(id).await.unwrap().expect("Post should still decode");
        assert_eq!(stored.visits, i64::MAX);
        assert_eq!(stored.likes, i64::MAX);
    }

    #[tokio::test]
    async fn test_url_queries() {
        let (_pool, repo) = setup_test_repo().await;
        let draft = repo.insert(&Post::new("Draft", "draft", "d")).await.unwrap();
        let id = draft.id.value().unwrap();

        assert!(repo.get_by_url("draft").await.unwrap().is_some());
        assert!(repo
            .get_by_url_and_status("draft", PostStatus::Published)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get_by_url_and_status("draft", PostStatus::Draft)
            .await
            .unwrap()
            .is_some());

        assert_eq!(repo.count_by_url("draft").await.unwrap(), 1);
        assert_eq!(repo.count_by_id_not_and_url(id, "draft").await.unwrap(), 0);
        assert_eq!(repo.count_by_id_not_and_url(id + 1, "draft").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_status_listing_and_paging() {
        let (_pool, repo) = setup_test_repo().await;
        let base = Utc::now() - Duration::days(10);
        for i in 0..5 {
            repo.insert(&published(&format!("p{}", i), base + Duration::days(i)))
                .await
                .unwrap();
        }
        repo.insert(&Post::new("Draft", "draft", "d")).await.unwrap();

        assert_eq!(repo.count_by_status(PostStatus::Published).await.unwrap(), 5);
        assert_eq!(repo.count_by_status(PostStatus::Draft).await.unwrap(), 1);

        let all = repo
            .find_all_by_status(PostStatus::Published, &Sort::unsorted())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let pageable = Pageable::sorted(1, 2, Sort::by(Order::desc(SortField::CreateTime)));
        let page = repo
            .find_all_by_status_paged(PostStatus::Published, &pageable)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let urls: Vec<&str> = page.content.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["p2", "p1"]);

        let everything = repo.find_all(&Pageable::of(0, 10)).await.unwrap();
        assert_eq!(everything.total, 6);
        assert_eq!(everything.len(), 6);
    }

    #[tokio::test]
    async fn test_create_time_windows() {
        let (_pool, repo) = setup_test_repo().await;
        let base = Utc::now() - Duration::days(10);
        for i in 0..5 {
            repo.insert(&published(&format!("p{}", i), base + Duration::days(i)))
                .await
                .unwrap();
        }

        let pivot = base + Duration::days(2);
        let after = repo
            .find_all_by_status_and_create_time_after(
                PostStatus::Published,
                pivot,
                &Pageable::sorted(0, 10, Sort::by(Order::asc(SortField::CreateTime))),
            )
            .await
            .unwrap();
        let urls: Vec<&str> = after.content.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["p3", "p4"]);
        assert_eq!(after.total, 2);

        let before = repo
            .find_all_by_status_and_create_time_before(
                PostStatus::Published,
                pivot,
                &Pageable::sorted(0, 1, Sort::by(Order::desc(SortField::CreateTime))),
            )
            .await
            .unwrap();
        let urls: Vec<&str> = before.content.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["p1"]);
        assert_eq!(before.total, 2);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.insert(&Post::new("Bye", "bye", "bye")).await.unwrap();
        let id = created.id.value().unwrap();

        assert_eq!(repo.delete_by_id(id).await.unwrap(), 1);
        assert_eq!(repo.delete_by_id(id).await.unwrap(), 0);
        assert!(repo.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_boxed_repository() {
        let pool = setup_test_pool().await;
        let repo: Arc<dyn PostRepository<Post>> = SqlxPostRepository::boxed(pool);

        repo.insert(&Post::new("Dyn", "dyn", "dyn")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
