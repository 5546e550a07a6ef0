//! HTTP client for the back-office REST API.
//!
//! Every request goes through [`ApiClient`], which resolves a bearer token
//! from an ordered [`TokenChain`] (local token store first, then the
//! `auth_token` cookie) and evicts the stored token whenever the server
//! answers `401`. Reads are cached in a [`QueryClient`]; the [`Console`]
//! ties the two together and implements the login/logout flows and typed
//! CRUD over every backend [`Resource`].
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use opsdesk_client::{Console, Credentials, Resource};
//!
//! let kv = Arc::new(opsdesk_kv::RedbStore::open(&path)?);
//! let console = Console::new("http://localhost:8000/api", kv)?;
//! console.login(&Credentials::new("0612345678", "secret")).await?;
//! let products = console.list(Resource::Products).await?;
//! ```

pub mod auth;
pub mod cache;
pub mod console;
pub mod error;
pub mod form;
pub mod http;
pub mod resource;
pub mod token;

pub use auth::{Credentials, LoginResponse};
pub use cache::{QueryClient, QueryKey};
pub use console::Console;
pub use error::ApiError;
pub use form::{flatten_fields, Attachment, FormBody};
pub use http::ApiClient;
pub use resource::{Action, Resource};
pub use token::{
    cookie_value, CookieToken, LocalStoreToken, TokenChain, TokenSource, TokenStore,
};
