//! Data models
//!
//! Models represent:
//! - Entity identity (`Id`) and the `Entity` capability trait
//! - Post variants (`Post`, `Sheet`) sharing `BasePost`
//! - Pagination types for list queries

mod entity;
mod page;
mod post;

pub use entity::{Entity, Id};
pub use page::{Direction, Order, Page, Pageable, Sort, SortField};
pub use post::{BasePost, Post, PostEntity, PostKind, PostStatus, Sheet};
