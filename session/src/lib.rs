//! Session management for the tourism API client
//!
//! This crate keeps the admin and tourist sessions apart: it persists each
//! kind's bearer token and principal through a `TokenStore`, orchestrates
//! login, logout and verification in a `SessionManager` per kind, and expires
//! exactly the targeted kind when the server answers 401.

pub mod adapters;
pub mod api;
pub mod interceptor;
pub mod manager;
pub mod navigator;
pub mod store;

pub use adapters::{FileBackend, InMemoryBackend};
pub use api::ApiClient;
pub use interceptor::ResponseInterceptor;
pub use manager::{SessionManager, Sessions};
pub use navigator::{ChannelNavigator, Navigation, Navigator, NavigatorRef, TracingNavigator};
pub use store::{StorageBackend, StorageBackendRef, StorageOp, StoreError, TokenStore};
