//! Cache module - named Moka caches shared through a registry.
//!
//! ## Architecture
//!
//! - `CacheRegistry` - hands out named caches; the same name and types
//!   always yield the same underlying cache
//! - `TypedCache` - thin typed handle over `moka::sync::Cache`
//! - `CacheConfig` - capacity/TTL presets per kind of data
//!
//! Repositories own their caches and invalidate them on every write.

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;
