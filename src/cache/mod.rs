pub mod market_cache;
pub mod store;

pub use market_cache::MarketCache;
pub use store::{FileStore, KvStore, MemoryStore};
