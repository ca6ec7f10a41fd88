mod adapter;
mod fetcher;
mod instagram;
mod opml;
mod reddit;
mod twitter;
mod youtube;

pub use adapter::{
    adapter_for, adapter_for_name, AdapterContext, SourceAdapter, DEFAULT_NITTER_INSTANCE,
    MAX_ITEMS_PER_FETCH,
};
pub use fetcher::{HttpFetcher, USER_AGENT};
pub use instagram::{InstagramAdapter, INSTAGRAM_BASE_URL};
pub use self::opml::{parse_opml, parse_opml_file};
pub use reddit::{RedditAdapter, REDDIT_BASE_URL};
pub use twitter::TwitterAdapter;
pub use youtube::{extract_handle, YoutubeAdapter, YoutubeHandle, YOUTUBE_BASE_URL};
