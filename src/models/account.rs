use serde::{Deserialize, Serialize};

use super::SourceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub picture_url: Option<String>,
}

/// One of a user's per-platform accounts; accounts follow channels of their own kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: SourceKind,
}

/// Which of a user's accounts an aggregation query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountFilter {
    #[default]
    All,
    Account(i64),
}

impl AccountFilter {
    pub fn account_id(&self) -> Option<i64> {
        match self {
            AccountFilter::All => None,
            AccountFilter::Account(id) => Some(*id),
        }
    }
}
