//! Local key-value persistence for the console.
//!
//! The console keeps exactly one durable piece of client state (the bearer
//! token under [`AUTH_TOKEN_KEY`]), but the store is a plain byte-oriented
//! KV so tests can swap the on-disk [`RedbStore`] for a [`MemoryStore`].

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use traits::KVStore;

/// Key under which the authenticated session token is persisted.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key holding the raw `auth_token` cookie value, so a cookie-backed
/// session outlives the process that received it.
pub const AUTH_COOKIE_KEY: &str = "auth_cookie";
