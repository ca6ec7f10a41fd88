mod account;
mod channel;
mod content;

pub use account::{Account, AccountFilter, User};
pub use channel::{Channel, NewChannel, SourceKind};
pub use content::{Content, Media, NewContent, NewMedia, NormalizedItem};
