mod file;
mod kv;
mod memory;

pub use file::FileStore;
pub use kv::{KvStore, StoreError};
pub use memory::MemoryStore;
