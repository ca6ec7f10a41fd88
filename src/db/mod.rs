mod aggregate;
mod repository;
mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Channel, NewContent, NewMedia, SourceKind};

pub use aggregate::{flatten_rows, JoinedRow};
pub use repository::Repository;

/// Storage operations the ingestion side depends on.
///
/// Implementations must be safe to call from many tasks at once and must enforce
/// uniqueness of `(channel_id, external_id)` for content themselves; the pipeline
/// takes no locks of its own.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;

    async fn find_channels_by_kind(&self, kind: SourceKind) -> Result<Vec<Channel>>;

    /// Inserts a content row. `Ok(None)` means the row already existed.
    async fn create_content(&self, content: NewContent) -> Result<Option<i64>>;

    async fn create_media(&self, media: NewMedia) -> Result<i64>;

    /// Deletes content published before `cutoff`, returning the number of rows removed.
    async fn cleanup_old_content(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Deletes channels no account follows anymore.
    async fn cleanup_orphaned_channels(&self) -> Result<usize>;
}
