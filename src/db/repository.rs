use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Channel, Media, NewChannel, NewContent, NewMedia, SourceKind};

use super::schema::SCHEMA;
use super::Storage;

const CHANNEL_COLUMNS: &str = "id, name, kind, profile_pic, external_id";

pub struct Repository {
    pub(super) conn: Connection,
    /// Offset read-side timestamps are presented in.
    pub(super) offset: FixedOffset,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            offset: Utc.fix(),
        })
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    // User and account operations

    pub async fn create_user(&self, email: &str, picture_url: Option<&str>) -> Result<i64> {
        let email = email.to_string();
        let picture_url = picture_url.map(str::to_string);
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (email, picture_url) VALUES (?1, ?2)",
                    params![email, picture_url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn create_account(&self, user_id: i64, name: &str, kind: SourceKind) -> Result<i64> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO accounts (user_id, name, kind) VALUES (?1, ?2, ?3)",
                    params![user_id, name, kind.as_str()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    // Channel operations

    /// Returns the stored channel and whether it had to be created.
    pub async fn create_channel_if_not_exists(&self, channel: NewChannel) -> Result<(Channel, bool)> {
        let result = self
            .conn
            .call(move |conn| {
                let existing = conn
                    .query_row(
                        &format!(
                            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE kind = ?1 AND external_id = ?2"
                        ),
                        params![channel.kind.as_str(), channel.external_id],
                        |row| channel_from_row(row, 0),
                    )
                    .optional()?;
                if let Some(existing) = existing {
                    return Ok((existing, false));
                }

                conn.execute(
                    "INSERT INTO channels (name, kind, profile_pic, external_id) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        channel.name,
                        channel.kind.as_str(),
                        channel.profile_pic,
                        channel.external_id
                    ],
                )?;
                let created = Channel {
                    id: conn.last_insert_rowid(),
                    name: channel.name,
                    kind: channel.kind,
                    external_id: channel.external_id,
                    profile_pic: channel.profile_pic,
                };
                Ok((created, true))
            })
            .await?;
        Ok(result)
    }

    pub async fn follow_channel(&self, account_id: i64, channel_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO account_channel (account_id, channel_id) VALUES (?1, ?2)",
                    params![account_id, channel_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn unfollow_channel(&self, account_id: i64, channel_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM account_channel WHERE account_id = ?1 AND channel_id = ?2",
                    params![account_id, channel_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Content operations

    /// External ids of a channel's content, newest first.
    pub async fn external_ids_for_channel(&self, channel_id: i64) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT external_id FROM content WHERE channel_id = ?1 ORDER BY published_at DESC, id DESC",
                )?;
                let ids = stmt
                    .query_map(params![channel_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    pub async fn media_for_content(&self, content_id: i64) -> Result<Vec<Media>> {
        let media = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, content_id, url FROM media WHERE content_id = ?1 ORDER BY id",
                )?;
                let media = stmt
                    .query_map(params![content_id], |row| {
                        Ok(Media {
                            id: row.get(0)?,
                            content_id: row.get(1)?,
                            url: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(media)
            })
            .await?;
        Ok(media)
    }
}

#[async_trait]
impl Storage for Repository {
    async fn ping(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn find_channels_by_kind(&self, kind: SourceKind) -> Result<Vec<Channel>> {
        let channels = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CHANNEL_COLUMNS} FROM channels WHERE kind = ?1 ORDER BY id"
                ))?;
                let channels = stmt
                    .query_map(params![kind.as_str()], |row| channel_from_row(row, 0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(channels)
            })
            .await?;
        Ok(channels)
    }

    async fn create_content(&self, content: NewContent) -> Result<Option<i64>> {
        let id = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO content (channel_id, title, published_at, external_id) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        content.channel_id,
                        content.title,
                        format_datetime(&content.published_at),
                        content.external_id,
                    ],
                );
                match inserted {
                    Ok(_) => Ok(Some(conn.last_insert_rowid())),
                    Err(err) if is_unique_violation(&err) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            })
            .await?;
        Ok(id)
    }

    async fn create_media(&self, media: NewMedia) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO media (content_id, url) VALUES (?1, ?2)",
                    params![media.content_id, media.url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn cleanup_old_content(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM content WHERE published_at < ?1",
                    params![format_datetime(&cutoff)],
                )?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }

    async fn cleanup_orphaned_channels(&self) -> Result<usize> {
        let removed = self
            .conn
            .call(|conn| {
                let removed = conn.execute(
                    "DELETE FROM channels WHERE id NOT IN (SELECT channel_id FROM account_channel)",
                    [],
                )?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Second precision with a `Z` suffix, so text order is chronological order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(super) fn datetime_from_row(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {raw:?}").into(),
        )
    })
}

/// Reads the five channel columns starting at `offset`.
pub(super) fn channel_from_row(row: &Row, offset: usize) -> rusqlite::Result<Channel> {
    let kind: String = row.get(offset + 2)?;
    let kind = kind.parse::<SourceKind>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            offset + 2,
            Type::Text,
            format!("unknown source kind {kind:?}").into(),
        )
    })?;

    Ok(Channel {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        kind,
        profile_pic: row.get(offset + 3)?,
        external_id: row.get(offset + 4)?,
    })
}
