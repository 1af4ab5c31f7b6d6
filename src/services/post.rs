//! Post service
//!
//! Business logic shared by every post variant:
//! - Visit/like counters and status counts
//! - Lookup by url, listing and pagination
//! - Neighbour lookup (previous/next published post by creation time)
//! - Create-or-update with url uniqueness checks and markdown rendering
//! - Redaction of password-protected content
//!
//! Generic create/read/delete work is delegated to a `CrudService` over the
//! same repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::repositories::PostRepository;
use crate::models::{Id, Order, Page, Pageable, PostEntity, PostStatus, Sheet, Sort, SortField};
use crate::services::crud::{require_id, require_pageable, CrudService};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::markdown::MarkdownRenderer;

/// Replacement text for the content of encrypted posts
pub const ENCRYPTED_TIP: &str = "The post is encrypted by author";

/// Service for one post variant
pub struct PostService<P: PostEntity> {
    repo: Arc<dyn PostRepository<P>>,
    crud: CrudService<P, dyn PostRepository<P>>,
    markdown_renderer: MarkdownRenderer,
}

/// Service for standalone pages
pub type SheetService = PostService<Sheet>;

fn require_text(value: &str, message: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid(message));
    }
    Ok(())
}

impl<P: PostEntity> PostService<P> {
    pub fn new(repo: Arc<dyn PostRepository<P>>, markdown_renderer: MarkdownRenderer) -> Self {
        Self {
            crud: CrudService::new(Arc::clone(&repo)),
            repo,
            markdown_renderer,
        }
    }

    /// Generic CRUD operations over the same repository
    pub fn crud(&self) -> &CrudService<P, dyn PostRepository<P>> {
        &self.crud
    }

    /// Total visits; zero when there are no posts
    pub async fn count_visit(&self) -> ServiceResult<u64> {
        let visits = self.repo.count_visit().await?;
        Ok(visits.unwrap_or(0).max(0) as u64)
    }

    /// Total likes; zero when there are no posts
    pub async fn count_like(&self) -> ServiceResult<u64> {
        let likes = self.repo.count_like().await?;
        Ok(likes.unwrap_or(0).max(0) as u64)
    }

    pub async fn count_by_status(&self, status: PostStatus) -> ServiceResult<u64> {
        let count = self.repo.count_by_status(status).await?;
        Ok(count.max(0) as u64)
    }

    pub async fn get_by_url(&self, url: &str) -> ServiceResult<P> {
        require_text(url, "Url must not be blank")?;

        self.repo
            .get_by_url(url)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("The {} does not exist", P::NAME), url))
    }

    pub async fn get_by(&self, status: PostStatus, url: &str) -> ServiceResult<P> {
        require_text(url, "Url must not be blank")?;

        self.repo
            .get_by_url_and_status(url, status)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(
                    format!(
                        "The {} with status {} and url {} does not exist",
                        P::NAME,
                        status,
                        url
                    ),
                    url,
                )
            })
    }

    pub async fn list_all_by(&self, status: PostStatus) -> ServiceResult<Vec<P>> {
        Ok(self
            .repo
            .find_all_by_status(status, &Sort::unsorted())
            .await?)
    }

    /// Up to `size` published posts created after `date`, closest first
    pub async fn list_pre_posts(&self, date: DateTime<Utc>, size: u32) -> ServiceResult<Vec<P>> {
        let pageable = Pageable::sorted(0, size, Sort::by(Order::asc(SortField::CreateTime)));
        require_pageable(&pageable)?;

        let page = self
            .repo
            .find_all_by_status_and_create_time_after(PostStatus::Published, date, &pageable)
            .await?;
        Ok(page.into_content())
    }

    /// Up to `size` published posts created before `date`, closest first
    pub async fn list_next_posts(&self, date: DateTime<Utc>, size: u32) -> ServiceResult<Vec<P>> {
        let pageable = Pageable::sorted(0, size, Sort::by(Order::desc(SortField::CreateTime)));
        require_pageable(&pageable)?;

        let page = self
            .repo
            .find_all_by_status_and_create_time_before(PostStatus::Published, date, &pageable)
            .await?;
        Ok(page.into_content())
    }

    pub async fn get_pre_post(&self, date: DateTime<Utc>) -> ServiceResult<Option<P>> {
        Ok(self.list_pre_posts(date, 1).await?.into_iter().next())
    }

    pub async fn get_next_post(&self, date: DateTime<Utc>) -> ServiceResult<Option<P>> {
        Ok(self.list_next_posts(date, 1).await?.into_iter().next())
    }

    /// The `top` most recently edited posts
    pub async fn page_latest(&self, top: i64) -> ServiceResult<Page<P>> {
        if top <= 0 {
            return Err(ServiceError::invalid("Top number must be greater than 0"));
        }
        let size = u32::try_from(top)
            .map_err(|_| ServiceError::invalid(format!("Top number {} is too large", top)))?;

        let latest = Pageable::sorted(0, size, Sort::by(Order::desc(SortField::EditTime)));
        self.crud.list_all(&latest).await
    }

    pub async fn page_by(&self, pageable: &Pageable) -> ServiceResult<Page<P>> {
        self.crud.list_all(pageable).await
    }

    pub async fn page_by_status(
        &self,
        status: PostStatus,
        pageable: &Pageable,
    ) -> ServiceResult<Page<P>> {
        require_pageable(pageable)?;
        Ok(self.repo.find_all_by_status_paged(status, pageable).await?)
    }

    pub async fn increase_visit_by(&self, visits: i64, post_id: Id) -> ServiceResult<()> {
        if visits <= 0 {
            return Err(ServiceError::invalid(
                "Visits to increase must not be less than 1",
            ));
        }
        let id = require_id(post_id, P::NAME)?;

        let affected = self.repo.update_visit(visits, id).await?;
        if affected != 1 {
            let err = ServiceError::BadRequest {
                message: format!(
                    "Failed to increase visits {} for {} with id {}",
                    visits,
                    P::NAME,
                    id
                ),
                post_id: id,
            };
            tracing::error!(
                post_id = id,
                affected,
                "Post with id [{}] may not be found or its counter is full",
                id
            );
            return Err(err);
        }

        Ok(())
    }

    pub async fn increase_like_by(&self, likes: i64, post_id: Id) -> ServiceResult<()> {
        if likes <= 0 {
            return Err(ServiceError::invalid(
                "Likes to increase must not be less than 1",
            ));
        }
        let id = require_id(post_id, P::NAME)?;

        let affected = self.repo.update_likes(likes, id).await?;
        if affected != 1 {
            let err = ServiceError::BadRequest {
                message: format!(
                    "Failed to increase likes {} for {} with id {}",
                    likes,
                    P::NAME,
                    id
                ),
                post_id: id,
            };
            tracing::error!(
                post_id = id,
                affected,
                "Post with id [{}] may not be found or its counter is full",
                id
            );
            return Err(err);
        }

        Ok(())
    }

    pub async fn increase_visit(&self, post_id: Id) -> ServiceResult<()> {
        self.increase_visit_by(1, post_id).await
    }

    pub async fn increase_like(&self, post_id: Id) -> ServiceResult<()> {
        self.increase_like_by(1, post_id).await
    }

    /// Persist a post: insert when it has no id, otherwise update it and
    /// record the edit time. `format_content` is always re-rendered.
    pub async fn create_or_update_by(&self, mut post: P) -> ServiceResult<P> {
        self.url_must_not_exist(&post).await?;

        let base = post.base_mut();
        base.format_content = self.markdown_renderer.render(&base.original_content);

        if !base.id.is_assigned() {
            let created = self.crud.create(post).await?;
            tracing::info!(id = %created.base().id, url = %created.base().url, "Created {}", P::NAME);
            return Ok(created);
        }

        base.edit_time = Some(Utc::now());
        let updated = self.crud.update(post).await?;
        tracing::info!(id = %updated.base().id, url = %updated.base().url, "Updated {}", P::NAME);
        Ok(updated)
    }

    /// Blank out the content of a password-protected post.
    ///
    /// Returns the redacted copy; nothing is written back to storage.
    pub fn filter_if_encrypt(&self, mut post: P) -> P {
        let base = post.base_mut();
        if base.is_encrypted() {
            base.summary = ENCRYPTED_TIP.to_string();
            base.original_content = ENCRYPTED_TIP.to_string();
            base.format_content = ENCRYPTED_TIP.to_string();
        }
        post
    }

    async fn url_must_not_exist(&self, post: &P) -> ServiceResult<()> {
        let base = post.base();
        require_text(&base.url, "Url must not be blank")?;

        let count = match base.id.value() {
            None => self.repo.count_by_url(&base.url).await?,
            Some(id) => self.repo.count_by_id_not_and_url(id, &base.url).await?,
        };

        if count > 0 {
            return Err(ServiceError::AlreadyExists(format!(
                "The {} url {} already exists",
                P::NAME,
                base.url
            )));
        }
        Ok(())
    }

    pub async fn fetch_by_id(&self, id: Id) -> ServiceResult<Option<P>> {
        self.crud.fetch_by_id(id).await
    }

    pub async fn get_by_id(&self, id: Id) -> ServiceResult<P> {
        self.crud.get_by_id(id).await
    }

    pub async fn exists_by_id(&self, id: Id) -> ServiceResult<bool> {
        self.crud.exists_by_id(id).await
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        self.crud.count().await
    }

    pub async fn remove_by_id(&self, id: Id) -> ServiceResult<P> {
        self.crud.remove_by_id(id).await
    }
}
