//! Services layer - Business logic
//!
//! Services are responsible for:
//! - Implementing business rules
//! - Validating input before it reaches a repository
//! - Rendering and redacting post content

pub mod crud;
pub mod error;
pub mod markdown;
pub mod post;

pub use crud::CrudService;
pub use error::{ServiceError, ServiceResult};
pub use markdown::MarkdownRenderer;
pub use post::{PostService, SheetService, ENCRYPTED_TIP};
