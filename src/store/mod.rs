//! Shared-store capability and its implementations.

mod memory;
mod redis;
mod shared;

pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use shared::{KeyTtl, SharedStore};
