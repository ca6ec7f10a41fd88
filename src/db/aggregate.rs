//! Paginated, denormalized reads over the content a user follows.
//!
//! The query returns one row per (content, media) pair, or a single row with null
//! media columns for content without media. Rows are folded back into nested
//! [`Content`] values in one pass, keeping first-seen order.

use std::collections::HashMap;

use chrono::FixedOffset;
use rusqlite::{params, Row};

use crate::error::Result;
use crate::models::{AccountFilter, Content, Media, SourceKind};

use super::repository::{channel_from_row, datetime_from_row};
use super::Repository;

// Paging happens on distinct content ids in the sub-query, never on joined rows.
const CONTENT_PAGE_QUERY: &str = r#"
SELECT ch.id, ch.name, ch.kind, ch.profile_pic, ch.external_id,
       c.id, c.title, c.published_at, c.external_id,
       m.id, m.url
FROM (
    SELECT DISTINCT c2.id, c2.title, c2.published_at, c2.external_id, c2.channel_id
    FROM content c2
    INNER JOIN account_channel ac2 ON ac2.channel_id = c2.channel_id
    INNER JOIN accounts a2 ON a2.id = ac2.account_id
    WHERE a2.user_id = ?1 AND a2.kind = ?2 AND (?3 IS NULL OR a2.id = ?3)
    ORDER BY c2.published_at DESC, c2.id DESC
    LIMIT ?4 OFFSET ?5
) AS c
INNER JOIN channels ch ON ch.id = c.channel_id
LEFT JOIN media m ON m.content_id = c.id
ORDER BY c.published_at DESC, c.id DESC, m.id ASC
"#;

const CONTENT_COUNT_QUERY: &str = r#"
SELECT COUNT(DISTINCT c.id)
FROM content c
INNER JOIN account_channel ac ON ac.channel_id = c.channel_id
INNER JOIN accounts a ON a.id = ac.account_id
WHERE a.user_id = ?1 AND a.kind = ?2 AND (?3 IS NULL OR a.id = ?3)
"#;

/// One row of the content/media join.
#[derive(Debug, Clone)]
pub struct JoinedRow {
    /// Content and channel projection; `media` is always empty here.
    pub content: Content,
    pub media: Option<Media>,
}

impl JoinedRow {
    fn from_row(row: &Row, offset: &FixedOffset) -> rusqlite::Result<Self> {
        let channel = channel_from_row(row, 0)?;
        let content_id: i64 = row.get(5)?;
        let content = Content {
            id: content_id,
            title: row.get(6)?,
            published_at: datetime_from_row(row, 7)?.with_timezone(offset),
            external_id: row.get(8)?,
            channel,
            media: Vec::new(),
        };

        let media = match row.get::<_, Option<i64>>(9)? {
            Some(id) => Some(Media {
                id,
                content_id,
                url: row.get(10)?,
            }),
            None => None,
        };

        Ok(Self { content, media })
    }
}

#[derive(Default)]
struct Flattened {
    contents: Vec<Content>,
    positions: HashMap<i64, usize>,
}

impl Flattened {
    fn push(mut self, row: JoinedRow) -> Self {
        let JoinedRow { content, media } = row;
        let contents = &mut self.contents;
        let idx = *self.positions.entry(content.id).or_insert_with(|| {
            contents.push(content);
            contents.len() - 1
        });

        if let Some(media) = media {
            self.contents[idx].media.push(media);
        }
        self
    }
}

/// Folds joined rows into nested content, preserving the order content first appears in.
pub fn flatten_rows<I>(rows: I) -> Vec<Content>
where
    I: IntoIterator<Item = JoinedRow>,
{
    rows.into_iter()
        .fold(Flattened::default(), Flattened::push)
        .contents
}

impl Repository {
    /// Newest-first page of content across the channels followed by `user_id`'s
    /// accounts of `kind`, timestamps in the repository's offset. A `limit` of
    /// zero returns everything from `offset` on.
    pub async fn query_content(
        &self,
        user_id: i64,
        kind: SourceKind,
        filter: AccountFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Content>> {
        let limit = if limit == 0 {
            -1
        } else {
            i64::try_from(limit).unwrap_or(i64::MAX)
        };
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let zone = self.offset;

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(CONTENT_PAGE_QUERY)?;
                let rows = stmt
                    .query_map(
                        params![user_id, kind.as_str(), filter.account_id(), limit, offset],
                        |row| JoinedRow::from_row(row, &zone),
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(flatten_rows(rows))
    }

    /// Number of distinct content items [`Repository::query_content`] can page through.
    pub async fn count_content(
        &self,
        user_id: i64,
        kind: SourceKind,
        filter: AccountFilter,
    ) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| {
                let count = conn.query_row(
                    CONTENT_COUNT_QUERY,
                    params![user_id, kind.as_str(), filter.account_id()],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}
