//! Stream adapters over the connection manager

mod feed;

pub use feed::{FeedEvent, live_feed};
