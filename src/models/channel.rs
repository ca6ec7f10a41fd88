use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The external platform a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Youtube,
    Reddit,
    Twitter,
    Instagram,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Youtube,
        SourceKind::Reddit,
        SourceKind::Twitter,
        SourceKind::Instagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Youtube => "youtube",
            SourceKind::Reddit => "reddit",
            SourceKind::Twitter => "twitter",
            SourceKind::Instagram => "instagram",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownSourceKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub kind: SourceKind,
    /// Shortest source-specific key that still identifies the upstream feed.
    pub external_id: String,
    pub profile_pic: Option<String>,
}

impl Channel {
    /// Browsable URL rebuilt from the stored external identifier.
    pub fn public_url(&self) -> String {
        match self.kind {
            SourceKind::Youtube => match self.external_id.split_once('=') {
                Some((key, value)) => {
                    format!("https://youtube.com/{}/{}", key.replace("_id", ""), value)
                }
                None => self.external_id.clone(),
            },
            SourceKind::Reddit => format!("https://reddit.com/r/{}/new", self.external_id),
            SourceKind::Twitter => format!("https://twitter.com/{}", self.external_id),
            SourceKind::Instagram => format!("https://instagram.com/{}", self.external_id),
        }
    }
}

/// Channel metadata produced by an adapter before the row exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub kind: SourceKind,
    pub external_id: String,
    pub profile_pic: Option<String>,
}
