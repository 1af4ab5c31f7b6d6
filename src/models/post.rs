//! Post model
//!
//! This module provides:
//! - `BasePost`, the record shared by every post variant
//! - `Post` (articles) and `Sheet` (standalone pages) built on top of it
//! - `PostStatus` and `PostKind` with their storage codes
//! - `PostEntity`, the capability trait the generic repository and service
//!   are written against

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

use super::entity::{Entity, Id};

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    /// Visible to readers
    Published,
    /// Work in progress
    #[default]
    Draft,
    /// Moved to the recycle bin, not yet deleted
    Recycle,
}

impl PostStatus {
    /// Integer code stored in the `status` column
    pub fn code(self) -> i32 {
        match self {
            PostStatus::Published => 0,
            PostStatus::Draft => 1,
            PostStatus::Recycle => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PostStatus::Published),
            1 => Some(PostStatus::Draft),
            2 => Some(PostStatus::Recycle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Published => "PUBLISHED",
            PostStatus::Draft => "DRAFT",
            PostStatus::Recycle => "RECYCLE",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator for post variants sharing the `posts` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostKind {
    Post,
    Sheet,
}

impl PostKind {
    /// Integer code stored in the `post_type` column
    pub const fn code(self) -> i32 {
        match self {
            PostKind::Post => 0,
            PostKind::Sheet => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PostKind::Post => "post",
            PostKind::Sheet => "sheet",
        }
    }
}

/// Fields common to every post variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePost {
    /// Storage key
    #[serde(default)]
    pub id: Id,
    pub title: String,
    /// URL-friendly path segment, unique per variant
    pub url: String,
    #[serde(default)]
    pub status: PostStatus,
    /// Markdown written by the author
    pub original_content: String,
    /// HTML rendered from `original_content`
    #[serde(default)]
    pub format_content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Access password; a non-blank value marks the content as restricted
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub disallow_comment: bool,
    /// Pinning weight, higher sorts first in listings that use it
    #[serde(default)]
    pub top_priority: i32,
    #[serde(default)]
    pub visits: i64,
    #[serde(default)]
    pub likes: i64,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Last time the author edited the post; `None` until the first update
    #[serde(default)]
    pub edit_time: Option<DateTime<Utc>>,
}

impl BasePost {
    /// Create an unsaved draft
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        original_content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Id::Unassigned,
            title: title.into(),
            url: url.into(),
            status: PostStatus::Draft,
            original_content: original_content.into(),
            format_content: String::new(),
            summary: String::new(),
            thumbnail: None,
            password: None,
            template: None,
            disallow_comment: false,
            top_priority: 0,
            visits: 0,
            likes: 0,
            create_time: now,
            update_time: now,
            edit_time: None,
        }
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Whether the content is protected by a non-blank password
    pub fn is_encrypted(&self) -> bool {
        self.password
            .as_deref()
            .is_some_and(|password| !password.trim().is_empty())
    }
}

/// A post variant usable by `PostRepository` and `PostService`.
pub trait PostEntity: Entity {
    /// Which rows of the `posts` table belong to this variant
    const KIND: PostKind;

    fn from_base(base: BasePost) -> Self;

    fn base(&self) -> &BasePost;

    fn base_mut(&mut self) -> &mut BasePost;
}

macro_rules! post_variant {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub BasePost);

        impl $name {
            /// Create an unsaved draft
            pub fn new(
                title: impl Into<String>,
                url: impl Into<String>,
                original_content: impl Into<String>,
            ) -> Self {
                Self(BasePost::new(title, url, original_content))
            }
        }

        impl Deref for $name {
            type Target = BasePost;

            fn deref(&self) -> &BasePost {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut BasePost {
                &mut self.0
            }
        }

        impl From<BasePost> for $name {
            fn from(base: BasePost) -> Self {
                Self(base)
            }
        }

        impl Entity for $name {
            const NAME: &'static str = $kind.as_str();

            fn id(&self) -> Id {
                self.0.id
            }

            fn prepare_create(&mut self, now: DateTime<Utc>) {
                self.0.create_time = now;
                self.0.update_time = now;
            }

            fn prepare_update(&mut self, now: DateTime<Utc>) {
                self.0.update_time = now;
            }
        }

        impl PostEntity for $name {
            const KIND: PostKind = $kind;

            fn from_base(base: BasePost) -> Self {
                Self(base)
            }

            fn base(&self) -> &BasePost {
                &self.0
            }

            fn base_mut(&mut self) -> &mut BasePost {
                &mut self.0
            }
        }
    };
}

post_variant!(
    /// Blog article
    Post,
    PostKind::Post
);

post_variant!(
    /// Standalone page such as "About" or "Links"
    Sheet,
    PostKind::Sheet
);
