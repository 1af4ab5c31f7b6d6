//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod post;

pub use post::{CrudRepository, PostRepository, SqlxPostRepository};
