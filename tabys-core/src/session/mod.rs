//! Session management for Tabys
//!
//! - [`SessionStore`] - key layout, JSON encoding and counters over a [`crate::kv::KvBackend`]
//! - [`SessionManager`] - create / get / refresh / delete with sliding expiration
//! - [`RateLimiter`] - fixed-window counters per (identity, action)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tabys_core::kv::MemoryKv;
//! use tabys_core::session::{SessionManager, SessionManagerConfig, SessionStore};
//!
//! let store = SessionStore::new(Arc::new(MemoryKv::new()));
//! let manager = SessionManager::with_config(
//!     store,
//!     SessionManagerConfig::new().with_ttl(std::time::Duration::from_secs(3600)),
//! );
//! ```

mod manager;
mod rate_limit;
mod store;

pub use manager::{SessionManager, SessionManagerConfig, DEFAULT_SESSION_TTL};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use store::{KeySpace, Session, SessionError, SessionResult, SessionStore};
