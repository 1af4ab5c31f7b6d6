//! Postdesk - post and sheet services for a blog CMS
//!
//! Bootstraps the storage stack and prints post statistics:
//!
//! ```text
//! postdesk [config.yml]
//! ```

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postdesk::{
    config::Config,
    db::{self, repositories::SqlxPostRepository},
    models::{Post, PostStatus, Sheet},
    services::{markdown::MarkdownRenderer, post::PostService, SheetService},
};

#[derive(Debug, Serialize)]
struct PostStats {
    posts: u64,
    published: u64,
    drafts: u64,
    recycled: u64,
    sheets: u64,
    visits: u64,
    likes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yml"));

    // Load configuration
    let config = Config::load_with_env(&config_path)?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let markdown_renderer = MarkdownRenderer::from_config(&config.markdown);
    tracing::debug!("Markdown code theme: {}", markdown_renderer.theme_name());

    let post_service: PostService<Post> =
        PostService::new(SqlxPostRepository::boxed(pool.clone()), markdown_renderer.clone());
    let sheet_service: SheetService =
        PostService::new(SqlxPostRepository::<Sheet>::boxed(pool.clone()), markdown_renderer);

    let stats = PostStats {
        posts: post_service.count().await?,
        published: post_service.count_by_status(PostStatus::Published).await?,
        drafts: post_service.count_by_status(PostStatus::Draft).await?,
        recycled: post_service.count_by_status(PostStatus::Recycle).await?,
        sheets: sheet_service.count().await?,
        visits: post_service.count_visit().await?,
        likes: post_service.count_like().await?,
    };
    tracing::info!(
        posts = stats.posts,
        sheets = stats.sheets,
        "Post statistics collected"
    );

    println!("{}", serde_json::to_string_pretty(&stats)?);

    pool.close().await;
    Ok(())
}
