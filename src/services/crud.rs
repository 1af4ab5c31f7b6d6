//! Generic CRUD service
//!
//! `CrudService` wraps any `CrudRepository` with id and pagination
//! validation and entity timestamp stamping. Specialised services hold one
//! and delegate to it instead of re-implementing the plain operations.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::db::repositories::CrudRepository;
use crate::models::{Entity, Id, Page, Pageable};
use crate::services::error::{ServiceError, ServiceResult};

/// Repository-backed CRUD helper for entity `T`
pub struct CrudService<T, R: ?Sized> {
    repository: Arc<R>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R: ?Sized> Clone for CrudService<T, R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            _entity: PhantomData,
        }
    }
}

/// Storage key of `id`, or `InvalidArgument` when it was never assigned
pub(crate) fn require_id(id: Id, name: &str) -> ServiceResult<i64> {
    id.value()
        .ok_or_else(|| ServiceError::invalid(format!("{} id must not be empty", name)))
}

/// Reject pageables that cannot produce a page
pub(crate) fn require_pageable(pageable: &Pageable) -> ServiceResult<()> {
    if pageable.size == 0 {
        return Err(ServiceError::invalid("Page size must be greater than 0"));
    }
    Ok(())
}

impl<T, R> CrudService<T, R>
where
    T: Entity,
    R: CrudRepository<T> + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            _entity: PhantomData,
        }
    }

    pub async fn list_all(&self, pageable: &Pageable) -> ServiceResult<Page<T>> {
        require_pageable(pageable)?;
        Ok(self.repository.find_all(pageable).await?)
    }

    pub async fn fetch_by_id(&self, id: Id) -> ServiceResult<Option<T>> {
        let id = require_id(id, T::NAME)?;
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Like `fetch_by_id`, but a miss is `NotFound`
    pub async fn get_by_id(&self, id: Id) -> ServiceResult<T> {
        self.fetch_by_id(id).await?.ok_or_else(|| {
            ServiceError::not_found(format!("{} was not found or has been deleted", T::NAME), id)
        })
    }

    pub async fn exists_by_id(&self, id: Id) -> ServiceResult<bool> {
        let id = require_id(id, T::NAME)?;
        Ok(self.repository.exists_by_id(id).await?)
    }

    pub async fn must_exist_by_id(&self, id: Id) -> ServiceResult<()> {
        if self.exists_by_id(id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(
                format!("{} was not found", T::NAME),
                id,
            ))
        }
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        let count = self.repository.count().await?;
        Ok(count.max(0) as u64)
    }

    /// Insert a new entity, stamping its creation metadata.
    pub async fn create(&self, mut entity: T) -> ServiceResult<T> {
        if entity.id().is_assigned() {
            return Err(ServiceError::invalid(format!(
                "A new {} must not carry an id",
                T::NAME
            )));
        }

        entity.prepare_create(Utc::now());
        let created = self
            .repository
            .insert(&entity)
            .await
            .with_context(|| format!("Failed to create {}", T::NAME))?;

        tracing::debug!(id = %created.id(), "Created {}", T::NAME);
        Ok(created)
    }

    /// Overwrite a stored entity, stamping its modification metadata.
    pub async fn update(&self, mut entity: T) -> ServiceResult<T> {
        let id = entity.id();
        require_id(id, T::NAME)?;

        entity.prepare_update(Utc::now());
        let updated = self
            .repository
            .update(&entity)
            .await
            .with_context(|| format!("Failed to update {} {}", T::NAME, id))?;

        updated.ok_or_else(|| {
            ServiceError::not_found(format!("{} was not found or has been deleted", T::NAME), id)
        })
    }

    /// Delete by id and return what was removed
    pub async fn remove_by_id(&self, id: Id) -> ServiceResult<T> {
        let entity = self.get_by_id(id).await?;
        let key = require_id(id, T::NAME)?;

        self.repository.delete_by_id(key).await?;
        tracing::debug!(id = key, "Removed {}", T::NAME);

        Ok(entity)
    }
}
