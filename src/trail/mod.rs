mod cache;
mod fix;

pub use cache::{Advisory, CacheError, TrailCache, TRAIL_CAPACITY, TRAIL_KEY};
pub use fix::Fix;
