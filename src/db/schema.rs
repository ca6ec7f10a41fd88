pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- users table
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    picture_url TEXT
);

-- accounts table (one per user and platform account)
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_user_kind ON accounts(user_id, kind);

-- channels table
CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    profile_pic TEXT,
    external_id TEXT NOT NULL,
    UNIQUE(kind, external_id)
);

CREATE INDEX IF NOT EXISTS idx_channels_kind ON channels(kind);

-- account_channel table (follows)
CREATE TABLE IF NOT EXISTS account_channel (
    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    channel_id INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    PRIMARY KEY(account_id, channel_id)
);

CREATE INDEX IF NOT EXISTS idx_account_channel_channel_id ON account_channel(channel_id);

-- content table
CREATE TABLE IF NOT EXISTS content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    published_at TEXT NOT NULL,
    external_id TEXT NOT NULL,
    UNIQUE(channel_id, external_id)
);

CREATE INDEX IF NOT EXISTS idx_content_published_at ON content(published_at DESC);

-- media table
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id INTEGER NOT NULL REFERENCES content(id) ON DELETE CASCADE,
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_content_id ON media(content_id);
"#;
